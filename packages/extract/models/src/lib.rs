#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the PDF extraction pipeline.
//!
//! These types flow between the PDF text extractor, the response parser,
//! the CSV sink, and the HTTP surface. They carry no behavior beyond
//! simple accessors so every stage can depend on them without pulling in
//! I/O or network crates.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Name of the column prepended to every header and row.
pub const REFERENCE_ID_COLUMN: &str = "Reference_ID";

/// Extension accepted for uploaded documents.
pub const PDF_EXTENSION: &str = ".pdf";

/// Identifier tagging every row extracted from one document.
///
/// Derived from the document's file name with the `.pdf` extension
/// removed, e.g. `survey_2021.pdf` becomes `survey_2021`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Creates a reference from an already-derived identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the reference from a document path.
    ///
    /// Only the final path component is used. A trailing `.pdf` is
    /// stripped; any other extension is left in place. Returns `None`
    /// when the path has no file name or the name is not valid UTF-8.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let id = name.strip_suffix(PDF_EXTENSION).unwrap_or(name);
        if id.is_empty() {
            return None;
        }
        Some(Self(id.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A window of a document's concatenated page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Zero-based position of this chunk within the document.
    pub index: usize,
    /// Character offset of the first character of this chunk.
    pub offset: usize,
    /// The chunk text.
    pub text: String,
}

impl TextChunk {
    /// Number of characters (not bytes) in this chunk.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Character offset one past the last character of this chunk.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.char_len()
    }
}

/// The text of one PDF, both whole and split into chunks.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// All page text, each page followed by a newline.
    pub full_text: String,
    /// Ordered, overlapping windows of [`Self::full_text`].
    pub chunks: Vec<TextChunk>,
}

/// One accepted data row: the document reference followed by the parsed
/// field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    fields: Vec<String>,
}

impl ExtractedRow {
    /// Builds a row by prepending `reference` to `values`.
    #[must_use]
    pub fn new(reference: &DocumentRef, values: Vec<String>) -> Self {
        let mut fields = Vec::with_capacity(values.len() + 1);
        fields.push(reference.as_str().to_string());
        fields.extend(values);
        Self { fields }
    }

    /// The document reference in column 0.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.fields[0]
    }

    /// The entity name in column 1, if the row has one.
    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        self.fields.get(1).map(String::as_str)
    }

    /// All fields, reference first.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// The outcome of parsing one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Header names, starting with [`REFERENCE_ID_COLUMN`].
    pub header: Vec<String>,
    /// Rows accepted after deduplication.
    pub rows: Vec<ExtractedRow>,
    /// Number of rows dropped because their entity name was already seen.
    pub duplicates: usize,
}

/// Processing stage of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DocumentState {
    /// Not yet started.
    Idle,
    /// Reading page text from the PDF.
    Extracting,
    /// Splitting the text into windows.
    Chunking,
    /// Waiting on the generative model for a chunk.
    Prompting,
    /// Turning a model response into rows.
    Parsing,
    /// All chunks handled.
    Done,
}

/// Counters for one processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Reference id of the document.
    pub reference: DocumentRef,
    /// Number of chunks sent to the model.
    pub chunks: usize,
    /// Chunks whose response was blank and therefore skipped.
    pub skipped_responses: usize,
    /// Rows written to the output CSV.
    pub rows_written: usize,
    /// Rows dropped as duplicates.
    pub duplicates: usize,
}

/// Counters for a whole batch of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Per-document results in processing order.
    pub documents: Vec<DocumentSummary>,
}

impl BatchSummary {
    /// Total rows written across all documents.
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.documents.iter().map(|d| d.rows_written).sum()
    }
}
