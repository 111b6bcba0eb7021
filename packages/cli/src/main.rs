#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the data extractor.
//!
//! ```text
//! data_extractor_cli extract <PDF_OR_DIR>...
//! data_extractor_cli columns add <NAME>...
//! data_extractor_cli columns remove
//! data_extractor_cli serve
//! ```
//!
//! Running with no subcommand enters an interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`data_extractor_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "data_extractor_cli",
    about = "Extract tabular data from PDFs with a generative model"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract rows from PDFs into the output CSV
    Extract {
        /// PDF files, or directories containing PDFs
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,
    },
    /// Edit the column block in the training data file
    Columns {
        #[command(subcommand)]
        action: ColumnsAction,
    },
    /// Start the HTTP server
    Serve,
}

#[derive(Subcommand)]
enum ColumnsAction {
    /// Describe the columns to extract
    Add {
        /// Column names, in order
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Remove the column block
    Remove,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = data_extractor_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Extract { pdfs } => {
            commands::extract(&multi, &pdfs).await?;
        }
        Commands::Columns {
            action: ColumnsAction::Add { names },
        } => commands::add_columns(names)?,
        Commands::Columns {
            action: ColumnsAction::Remove,
        } => commands::remove_columns()?,
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(data_extractor_server::run_server())
            })
            .await??;
        }
    }

    Ok(())
}
