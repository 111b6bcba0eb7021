//! Pipe-table response parsing.
//!
//! Model responses are expected to look like a markdown table:
//!
//! ```text
//! | Name        | Count |
//! |-------------|-------|
//! | Panthera leo| 3     |
//! ```
//!
//! The first line is the header, the second is a separator and is skipped
//! without inspection, and every later line is a data row. Rows are not
//! checked against the header's column count.

use std::collections::HashSet;

use data_extractor_extract_models::{DocumentRef, ExtractedRow, ParsedTable, REFERENCE_ID_COLUMN};

use crate::normalize::normalize_name;

/// Splits one table line on `|`, trimming each cell and dropping cells
/// that are empty after trimming.
#[must_use]
pub fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(String::from)
        .collect()
}

/// Parses one model response into a header and deduplicated rows.
///
/// `seen` holds the normalized entity names already accepted for the
/// current document. A row whose normalized name (column 1, right after
/// the reference) is already present is dropped; otherwise the name is
/// recorded and the row accepted.
///
/// Returns `None` when the response has no lines at all.
#[must_use]
pub fn parse_response(
    text: &str,
    reference: &DocumentRef,
    seen: &mut HashSet<String>,
) -> Option<ParsedTable> {
    let mut lines = text.trim().lines();
    let header_line = lines.next()?;

    let mut header = vec![REFERENCE_ID_COLUMN.to_string()];
    header.extend(split_cells(header_line));

    let mut table = ParsedTable {
        header,
        rows: Vec::new(),
        duplicates: 0,
    };

    log::debug!("Processing model response for Reference ID: {reference}");

    for line in lines.skip(1) {
        let values = split_cells(line);
        if values.is_empty() {
            continue;
        }

        let row = ExtractedRow::new(reference, values);
        let name = normalize_name(row.entity_name().unwrap_or_default());

        if seen.insert(name.clone()) {
            table.rows.push(row);
        } else {
            log::info!("Duplicate entity skipped: {name} (Ref ID: {reference})");
            table.duplicates += 1;
        }
    }

    Some(table)
}
