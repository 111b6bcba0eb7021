//! Interactive menu shown when no subcommand is given.

use std::path::PathBuf;

use data_extractor_cli_utils::MultiProgress;
use data_extractor_extract::config::DEFAULT_UPLOAD_DIR;
use dialoguer::{Input, Select};

use crate::commands;

/// Top-level actions.
enum Action {
    Extract,
    AddColumns,
    RemoveColumns,
    Serve,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Extract,
        Self::AddColumns,
        Self::RemoveColumns,
        Self::Serve,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Extract => "Extract data from PDFs",
            Self::AddColumns => "Add columns to training data",
            Self::RemoveColumns => "Remove columns from training data",
            Self::Serve => "Start server",
        }
    }
}

/// Prompts for an action and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the chosen action fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Data Extractor");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Extract => {
            let default_dir =
                std::env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string());
            let input: String = Input::new()
                .with_prompt("PDF file or directory")
                .default(default_dir)
                .interact_text()?;

            commands::extract(multi, &[PathBuf::from(input)]).await?;
        }
        Action::AddColumns => {
            let input: String = Input::new()
                .with_prompt("Column names (comma-separated)")
                .interact_text()?;
            let names = input
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .collect();

            commands::add_columns(names)?;
        }
        Action::RemoveColumns => commands::remove_columns()?,
        Action::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new()
                    .block_on(data_extractor_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}
