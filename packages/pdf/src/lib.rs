#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF text extraction for the extraction pipeline.
//!
//! Reads the plain text of every page with pure-Rust extraction
//! ([`pdf_extract`]), concatenates the pages, and splits the result into
//! overlapping windows ([`chunk`]) small enough to send to a generative
//! model one at a time.

pub mod chunk;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use data_extractor_extract_models::ExtractedDocument;

pub use chunk::{ChunkingConfig, chunk_text};

/// Errors specific to PDF extraction.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk size and overlap do not describe a forward-moving window.
    #[error("Invalid chunking: overlap {overlap} must be smaller than size {size}")]
    InvalidChunking {
        /// Requested window size.
        size: usize,
        /// Requested overlap.
        overlap: usize,
    },
}

/// Reads the plain text of every page of the PDF at `path`, in page order.
///
/// # Errors
///
/// Returns [`PdfError::Io`] if the file cannot be read and
/// [`PdfError::Extraction`] if it cannot be parsed as a PDF.
pub fn extract_pages(path: &Path) -> Result<Vec<String>, PdfError> {
    let bytes = std::fs::read(path)?;

    log::debug!("Read {} bytes from {}", bytes.len(), path.display());

    // pdf_extract panics on some malformed input instead of returning an error.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    }));

    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(PdfError::Extraction(format!(
            "failed to extract text from {}: {e}",
            path.display()
        ))),
        Err(_) => Err(PdfError::Extraction(format!(
            "PDF extraction panicked on {} (malformed document)",
            path.display()
        ))),
    }
}

/// Joins page texts, terminating each page with a newline.
#[must_use]
pub fn concat_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

/// Extracts the full text of a PDF and splits it into windows.
///
/// # Errors
///
/// Returns [`PdfError`] if the file cannot be read or parsed.
pub fn extract_and_chunk(
    path: &Path,
    config: &ChunkingConfig,
) -> Result<ExtractedDocument, PdfError> {
    log::info!("Extracting text from: {}", path.display());

    let pages = extract_pages(path)?;
    let full_text = concat_pages(&pages);
    let chunks = chunk_text(&full_text, config);

    log::info!(
        "{}: {} page(s), {} characters, {} chunk(s)",
        path.display(),
        pages.len(),
        full_text.chars().count(),
        chunks.len()
    );

    Ok(ExtractedDocument { full_text, chunks })
}
