#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Chunked PDF-to-CSV extraction driven by a generative model.
//!
//! Each PDF is split into overlapping text windows ([`data_extractor_pdf`]).
//! Every window, prefixed by the previous one, is sent to the model along
//! with the training context ([`context`]). The model answers with a pipe
//! table that [`parser`] turns into rows, deduplicated per document by
//! normalized entity name ([`normalize`]), and [`sink`] appends them to a
//! shared CSV file. [`orchestrator::Extractor`] ties the stages together.

pub mod config;
pub mod context;
pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod progress;
pub mod sink;

use std::path::PathBuf;

use data_extractor_ai::AiError;
use data_extractor_pdf::PdfError;
use thiserror::Error;

pub use config::ExtractConfig;
pub use orchestrator::Extractor;

/// Errors that can occur while extracting data from documents.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a CSV record failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading or chunking a PDF failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// The background PDF extraction task did not complete.
    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The generative model call failed.
    #[error("Model error: {0}")]
    Ai(#[from] AiError),

    /// The context file has no column block to remove.
    #[error("No columns found to remove in {}", path.display())]
    MissingColumnBlock {
        /// The context file that was searched.
        path: PathBuf,
    },

    /// A column block was requested with no columns.
    #[error("No column names provided")]
    EmptyColumns,

    /// A document path has no usable file name to derive a reference from.
    #[error("Cannot derive a reference id from {}", path.display())]
    InvalidFileName {
        /// The offending path.
        path: PathBuf,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
