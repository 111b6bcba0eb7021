//! Pipeline configuration read from environment variables.

use std::path::PathBuf;

use data_extractor_pdf::ChunkingConfig;
use data_extractor_pdf::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

use crate::ExtractError;

/// Default directory uploaded PDFs are staged in.
pub const DEFAULT_UPLOAD_DIR: &str = "./pdfs3";

/// Default path of the training/context text file.
pub const DEFAULT_CONTEXT_FILE: &str = "data/training_data.txt";

/// Default path of the shared output CSV.
pub const DEFAULT_OUTPUT_CSV: &str = "outputs/main.csv";

/// File locations and chunking parameters for the pipeline.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Directory uploaded PDFs are staged in before processing.
    pub upload_dir: PathBuf,
    /// Training/context text sent with every chunk.
    pub context_file: PathBuf,
    /// Shared output CSV.
    pub output_csv: PathBuf,
    /// Chunk window size and overlap.
    pub chunking: ChunkingConfig,
}

impl ExtractConfig {
    /// Builds the configuration from the environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `UPLOAD_DIR` | `./pdfs3` |
    /// | `TRAINING_DATA_FILE` | `data/training_data.txt` |
    /// | `OUTPUT_CSV` | `outputs/main.csv` |
    /// | `CHUNK_SIZE` | `5000` |
    /// | `CHUNK_OVERLAP` | `500` |
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Config`] if a numeric variable does not
    /// parse, or [`ExtractError::Pdf`] if the chunk overlap is not smaller
    /// than the chunk size.
    pub fn from_env() -> Result<Self, ExtractError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `var`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ExtractError> {
        let path_var = |name: &str, default: &str| {
            PathBuf::from(var(name).unwrap_or_else(|| default.to_string()))
        };

        let size = parse_usize("CHUNK_SIZE", var("CHUNK_SIZE").as_deref(), DEFAULT_CHUNK_SIZE)?;
        let overlap = parse_usize(
            "CHUNK_OVERLAP",
            var("CHUNK_OVERLAP").as_deref(),
            DEFAULT_CHUNK_OVERLAP,
        )?;

        Ok(Self {
            upload_dir: path_var("UPLOAD_DIR", DEFAULT_UPLOAD_DIR),
            context_file: path_var("TRAINING_DATA_FILE", DEFAULT_CONTEXT_FILE),
            output_csv: path_var("OUTPUT_CSV", DEFAULT_OUTPUT_CSV),
            chunking: ChunkingConfig::new(size, overlap)?,
        })
    }
}

fn parse_usize(name: &str, value: Option<&str>, default: usize) -> Result<usize, ExtractError> {
    value.map_or(Ok(default), |value| {
        value.trim().parse().map_err(|_| ExtractError::Config {
            message: format!("{name} must be a non-negative integer, got '{value}'"),
        })
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use data_extractor_pdf::PdfError;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ExtractConfig, ExtractError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ExtractConfig::from_vars(|name| map.get(name).map(ToString::to_string))
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.upload_dir, PathBuf::from(DEFAULT_UPLOAD_DIR));
        assert_eq!(config.context_file, PathBuf::from(DEFAULT_CONTEXT_FILE));
        assert_eq!(config.output_csv, PathBuf::from(DEFAULT_OUTPUT_CSV));
        assert_eq!(config.chunking, ChunkingConfig::default());
    }

    #[test]
    fn reads_paths_and_chunking() {
        let config = from_pairs(&[
            ("OUTPUT_CSV", "/tmp/out.csv"),
            ("CHUNK_SIZE", " 1000 "),
            ("CHUNK_OVERLAP", "100"),
        ])
        .unwrap();
        assert_eq!(config.output_csv, PathBuf::from("/tmp/out.csv"));
        assert_eq!(config.chunking.size(), 1000);
        assert_eq!(config.chunking.overlap(), 100);
    }

    #[test]
    fn non_numeric_chunk_size_is_a_config_error() {
        match from_pairs(&[("CHUNK_SIZE", "large")]) {
            Err(ExtractError::Config { message }) => assert!(message.contains("CHUNK_SIZE")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        for overlap in ["500", "600"] {
            let result = from_pairs(&[("CHUNK_SIZE", "500"), ("CHUNK_OVERLAP", overlap)]);
            assert!(matches!(
                result,
                Err(ExtractError::Pdf(PdfError::InvalidChunking { size: 500, .. }))
            ));
        }
    }
}
