//! Per-document, per-chunk extraction loop.
//!
//! Documents are processed strictly in order, one at a time, and so are
//! the chunks of each document: the prompt for chunk N carries the raw
//! text of the last chunk that produced a response, so chunk N cannot be
//! sent before chunk N-1 has been handled.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use data_extractor_ai::providers::TextGenerator;
use data_extractor_extract_models::{
    BatchSummary, DocumentRef, DocumentState, DocumentSummary, TextChunk,
};
use data_extractor_pdf::ChunkingConfig;

use crate::context::ContextFile;
use crate::parser::parse_response;
use crate::progress::ProgressCallback;
use crate::sink::CsvSink;
use crate::{ExtractConfig, ExtractError};

/// Instruction sent between the context text and the chunk text.
const EXTRACTION_INSTRUCTION: &str = "Extract only species-related data directly found in the \
     following text. Do not add fabricated or unrelated information:";

/// Final prompt part cueing the model to start its table.
const OUTPUT_CUE: &str = "output: ";

/// Builds the prompt parts for one chunk payload.
#[must_use]
pub fn build_prompt(context: &str, payload: &str) -> Vec<String> {
    vec![
        context.to_string(),
        format!("{EXTRACTION_INSTRUCTION}\n{payload}"),
        OUTPUT_CUE.to_string(),
    ]
}

/// Drives PDFs through extraction, prompting, parsing, and CSV output.
pub struct Extractor {
    generator: Box<dyn TextGenerator>,
    sink: CsvSink,
    context: ContextFile,
    chunking: ChunkingConfig,
}

impl Extractor {
    /// Creates an extractor from its parts.
    #[must_use]
    pub fn new(
        generator: Box<dyn TextGenerator>,
        sink: CsvSink,
        context: ContextFile,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            generator,
            sink,
            context,
            chunking,
        }
    }

    /// Creates an extractor using the file locations in `config`.
    #[must_use]
    pub fn from_config(generator: Box<dyn TextGenerator>, config: &ExtractConfig) -> Self {
        Self::new(
            generator,
            CsvSink::new(&config.output_csv),
            ContextFile::new(&config.context_file),
            config.chunking,
        )
    }

    /// The output CSV.
    #[must_use]
    pub const fn sink(&self) -> &CsvSink {
        &self.sink
    }

    /// The training/context file.
    #[must_use]
    pub const fn context(&self) -> &ContextFile {
        &self.context
    }

    /// Processes every document in order.
    ///
    /// The context file is read once for the whole batch. The first
    /// failure aborts the batch; rows already appended stay in the CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the context file cannot be read or any
    /// document fails.
    pub async fn process_batch(
        &self,
        paths: &[PathBuf],
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<BatchSummary, ExtractError> {
        let context = self.context.read()?;
        let mut summary = BatchSummary::default();

        for path in paths {
            let document = self.process_document(path, &context, progress).await?;
            summary.documents.push(document);
        }

        log::info!(
            "All PDFs processed: {} document(s), {} row(s) written",
            summary.documents.len(),
            summary.rows_written()
        );
        progress.finish(format!(
            "{} document(s), {} row(s)",
            summary.documents.len(),
            summary.rows_written()
        ));

        Ok(summary)
    }

    /// Extracts, chunks, and processes one PDF.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidFileName`] if no reference can be
    /// derived from `path`, [`ExtractError::Join`] if the extraction task
    /// is cancelled or panics, or any error from extraction, the model, or
    /// the CSV sink.
    pub async fn process_document(
        &self,
        path: &Path,
        context: &str,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<DocumentSummary, ExtractError> {
        let reference = DocumentRef::from_path(path).ok_or_else(|| ExtractError::InvalidFileName {
            path: path.to_path_buf(),
        })?;
        transition(&reference, DocumentState::Idle);

        log::info!(
            "=== Processing PDF: {} with Reference ID: {reference} ===",
            path.display()
        );
        transition(&reference, DocumentState::Extracting);

        // PDF parsing is CPU-bound and must not stall the async worker.
        let owned_path = path.to_path_buf();
        let chunking = self.chunking;
        let document = tokio::task::spawn_blocking(move || {
            data_extractor_pdf::extract_and_chunk(&owned_path, &chunking)
        })
        .await??;
        transition(&reference, DocumentState::Chunking);

        self.process_chunks(&reference, context, &document.chunks, progress)
            .await
    }

    /// Sends each chunk to the model and appends the parsed rows.
    ///
    /// The deduplication set and the lookback buffer live only for this
    /// call. A blank response is skipped without advancing the lookback
    /// buffer, so the next prompt still carries the last chunk the model
    /// actually answered for.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Ai`] if the model call fails, or a sink
    /// error if rows cannot be written.
    pub async fn process_chunks(
        &self,
        reference: &DocumentRef,
        context: &str,
        chunks: &[TextChunk],
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<DocumentSummary, ExtractError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut previous: &str = "";
        let mut summary = DocumentSummary {
            reference: reference.clone(),
            chunks: chunks.len(),
            skipped_responses: 0,
            rows_written: 0,
            duplicates: 0,
        };

        progress.set_message(reference.to_string());
        progress.set_total(chunks.len() as u64);

        for chunk in chunks {
            log::info!(
                "Processing chunk {}/{} for {reference}...",
                chunk.index + 1,
                chunks.len()
            );
            transition(reference, DocumentState::Prompting);

            let payload = format!("{previous}{}", chunk.text);
            let response = self
                .generator
                .generate(&build_prompt(context, &payload))
                .await?;
            progress.inc(1);

            if response.trim().is_empty() {
                log::info!(
                    "Skipping empty response for chunk {} (Ref ID: {reference})",
                    chunk.index + 1
                );
                summary.skipped_responses += 1;
                continue;
            }

            log::debug!(
                "Response for chunk {} (Ref ID: {reference}): {}...",
                chunk.index + 1,
                response.chars().take(100).collect::<String>()
            );

            transition(reference, DocumentState::Parsing);
            if let Some(table) = parse_response(&response, reference, &mut seen) {
                summary.rows_written += self.sink.append(&table.header, &table.rows)?;
                summary.duplicates += table.duplicates;
            }

            previous = &chunk.text;
        }

        transition(reference, DocumentState::Done);
        log::info!(
            "Finished processing {reference}: {} row(s), {} duplicate(s), {} empty response(s)",
            summary.rows_written,
            summary.duplicates,
            summary.skipped_responses
        );

        Ok(summary)
    }
}

fn transition(reference: &DocumentRef, state: DocumentState) {
    log::trace!("[{reference}] -> {state}");
}
