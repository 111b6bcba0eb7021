//! Implementations shared by the subcommands and the interactive menu.

use std::path::{Path, PathBuf};

use data_extractor_cli_utils::{IndicatifProgress, MultiProgress};
use data_extractor_extract::context::{ColumnBlock, ContextFile};
use data_extractor_extract::{ExtractConfig, Extractor};
use data_extractor_extract_models::{BatchSummary, PDF_EXTENSION};

/// Expands `inputs` into the PDFs to process.
///
/// Files are kept as given, in order. A directory contributes its direct
/// children ending in `.pdf`, sorted by name.
///
/// # Errors
///
/// Returns an error if an input does not exist or a directory cannot be
/// listed.
pub fn collect_pdfs(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| is_pdf(path))
                .collect();
            found.sort();
            log::debug!("Found {} PDF(s) in {}", found.len(), input.display());
            pdfs.extend(found);
        } else if input.is_file() {
            pdfs.push(input.clone());
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", input.display()),
            ));
        }
    }

    Ok(pdfs)
}

fn is_pdf(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(PDF_EXTENSION))
}

/// Runs the extraction pipeline over `inputs` with a progress bar.
///
/// # Errors
///
/// Returns an error if configuration fails, no PDFs are found, or any
/// document fails to process.
pub async fn extract(
    multi: &MultiProgress,
    inputs: &[PathBuf],
) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let config = ExtractConfig::from_env()?;
    let pdfs = collect_pdfs(inputs)?;
    if pdfs.is_empty() {
        return Err("No PDF files found".into());
    }

    let generator = data_extractor_ai::create_generator_from_env()?;
    let extractor = Extractor::from_config(generator, &config);
    let progress = IndicatifProgress::chunks_bar(multi, "Reading PDFs...");

    log::info!(
        "Extracting {} PDF(s) into {}",
        pdfs.len(),
        config.output_csv.display()
    );
    let summary = extractor.process_batch(&pdfs, &progress).await?;

    for document in &summary.documents {
        println!(
            "{:<40} {:>4} chunk(s) {:>5} row(s) {:>4} duplicate(s) {:>3} empty",
            document.reference.as_str(),
            document.chunks,
            document.rows_written,
            document.duplicates,
            document.skipped_responses
        );
    }
    println!(
        "\n{} row(s) appended to {}",
        summary.rows_written(),
        config.output_csv.display()
    );

    Ok(summary)
}

/// Injects a column block for `names` into the context file.
///
/// # Errors
///
/// Returns an error if `names` is empty or the file cannot be updated.
pub fn add_columns(names: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExtractConfig::from_env()?;
    let block = ColumnBlock::new(names)?;
    ContextFile::new(&config.context_file).inject_columns(&block)?;
    println!(
        "Injected {} column(s) into {}",
        block.columns().len(),
        config.context_file.display()
    );
    Ok(())
}

/// Removes the column block from the context file.
///
/// # Errors
///
/// Returns an error if the file has no block or cannot be updated.
pub fn remove_columns() -> Result<(), Box<dyn std::error::Error>> {
    let config = ExtractConfig::from_env()?;
    ContextFile::new(&config.context_file).remove_columns()?;
    println!("Removed columns from {}", config.context_file.display());
    Ok(())
}
