#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the data extractor server.
//!
//! The JSON shapes are part of the HTTP contract consumed by the upload
//! frontend, so success bodies use `message`, validation failures on the
//! columns endpoint use `error`, and processing failures use `detail`.

use serde::{Deserialize, Serialize};

/// Request body for `POST /upload-columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInput {
    /// Column names to describe to the model, in order.
    pub columns: Vec<String>,
}

/// A plain success message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Human-readable outcome.
    pub message: String,
}

impl ApiMessage {
    /// Creates a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A validation error reported under `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// What was wrong with the request.
    pub error: String,
}

/// A failure reported under `detail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDetail {
    /// What went wrong.
    pub detail: String,
}

impl ApiDetail {
    /// Creates a detail body.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_input_parses_frontend_payload() {
        let input: ColumnInput =
            serde_json::from_str(r#"{"columns": ["Species", "Count"]}"#).unwrap();
        assert_eq!(input.columns, vec!["Species", "Count"]);
    }

    #[test]
    fn bodies_use_contract_keys() {
        assert_eq!(
            serde_json::to_string(&ApiMessage::new("ok")).unwrap(),
            r#"{"message":"ok"}"#
        );
        assert_eq!(
            serde_json::to_string(&ApiDetail::new("bad")).unwrap(),
            r#"{"detail":"bad"}"#
        );
    }
}
