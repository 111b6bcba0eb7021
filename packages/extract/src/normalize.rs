//! Entity name normalization for deduplication.
//!
//! Two names that differ only in a parenthesized suffix (an authority,
//! a common name), punctuation, case, or surrounding whitespace compare
//! equal after [`normalize_name`].

use regex::Regex;
use std::sync::LazyLock;

/// Matches a parenthesized substring or any character that is not a word
/// character, whitespace, `.`, or `-`.
static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)|[^\w\s.-]").expect("valid regex"));

/// Canonicalizes an entity name for comparison.
///
/// The pipeline:
/// 1. Remove parenthesized substrings and disallowed punctuation
/// 2. Trim
/// 3. Lowercase
#[must_use]
pub fn normalize_name(name: &str) -> String {
    STRIP_RE.replace_all(name, "").trim().to_lowercase()
}
