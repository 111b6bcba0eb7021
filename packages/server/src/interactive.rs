//! Interactive mode for the server.
//!
//! Prompts for the listen address and the pipeline's file locations, then
//! starts the server with the answers. Values set in the environment are
//! offered as the defaults.

use std::path::{Path, PathBuf};

use data_extractor_extract::ExtractConfig;
use dialoguer::{Confirm, Input};

/// Prompts for a path, offering `current` as the default.
fn prompt_path(prompt: &str, current: &Path) -> PathBuf {
    let current = current.display().to_string();
    let value: String = Input::new()
        .with_prompt(prompt)
        .default(current.clone())
        .interact_text()
        .unwrap_or(current);
    PathBuf::from(value)
}

/// Runs the server in interactive mode, prompting for configuration.
///
/// The answers are passed straight to [`super::serve`]; the process
/// environment is never modified.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the environment configuration is
/// invalid or the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Data Extractor Server");
    println!();

    let mut config = ExtractConfig::from_env().map_err(std::io::Error::other)?;
    let (default_addr, default_port) = super::listen_addr_from_env();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(default_addr.clone())
        .interact_text()
        .unwrap_or(default_addr);

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(default_port)
        .interact_text()
        .unwrap_or(default_port);

    config.upload_dir = prompt_path("Upload directory", &config.upload_dir);
    config.context_file = prompt_path("Training data file", &config.context_file);
    config.output_csv = prompt_path("Output CSV", &config.output_csv);

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::serve(config, &bind_addr, port).await
}
