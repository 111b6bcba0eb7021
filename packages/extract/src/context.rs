//! The training/context text sent to the model with every chunk.
//!
//! Callers can describe the columns they want extracted. The description is
//! a small pipe-table skeleton framed by [`START_MARKER`] and [`END_MARKER`]
//! and inserted before line 20 of the context file. After an upload
//! finishes the block is removed again, restoring the file byte for byte.

use std::path::{Path, PathBuf};

use crate::ExtractError;

/// Line that opens an injected column block.
pub const START_MARKER: &str = "<!--START_COLUMNS-->";

/// Line that closes an injected column block.
pub const END_MARKER: &str = "<!--END_COLUMNS-->";

/// Zero-based line index the block is inserted at (the 20th line).
pub const INJECT_LINE_INDEX: usize = 19;

/// A validated, non-empty list of column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBlock {
    columns: Vec<String>,
}

impl ColumnBlock {
    /// Creates a block from column names.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyColumns`] if `columns` is empty.
    pub fn new(columns: Vec<String>) -> Result<Self, ExtractError> {
        if columns.is_empty() {
            return Err(ExtractError::EmptyColumns);
        }
        Ok(Self { columns })
    }

    /// The column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Renders the marker-framed table skeleton, ending with a newline.
    #[must_use]
    pub fn render(&self) -> String {
        let row = |cells: Vec<&str>| format!("| {} |", cells.join(" | "));
        let n = self.columns.len();

        [
            START_MARKER.to_string(),
            row(self.columns.iter().map(String::as_str).collect()),
            row(vec!["---"; n]),
            row(vec!["None"; n]),
            END_MARKER.to_string(),
        ]
        .join("\n")
            + "\n"
    }
}

/// Inserts `block` before line [`INJECT_LINE_INDEX`] of `content`, or at
/// the end when `content` has fewer lines.
#[must_use]
pub fn insert_block(content: &str, block: &ColumnBlock) -> String {
    let rendered = block.render();
    let mut lines: Vec<&str> = content.split_inclusive('\n').collect();
    let at = INJECT_LINE_INDEX.min(lines.len());
    lines.insert(at, &rendered);
    lines.concat()
}

/// Removes the first marker-framed block from `content`, including the
/// newline that terminates the end marker.
///
/// Returns `None` when either marker is missing.
#[must_use]
pub fn remove_block(content: &str) -> Option<String> {
    let start = content.find(START_MARKER)?;
    let end = start + content[start..].find(END_MARKER)? + END_MARKER.len();
    let end = if content[end..].starts_with('\n') {
        end + 1
    } else {
        end
    };

    let mut out = String::with_capacity(content.len() - (end - start));
    out.push_str(&content[..start]);
    out.push_str(&content[end..]);
    Some(out)
}

/// The context file on disk.
#[derive(Debug, Clone)]
pub struct ContextFile {
    path: PathBuf,
}

impl ContextFile {
    /// Wraps the context file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the context file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole context text.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be read.
    pub fn read(&self) -> Result<String, ExtractError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// Whether the file currently contains a column block.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be read.
    pub fn has_columns(&self) -> Result<bool, ExtractError> {
        let content = self.read()?;
        Ok(content.contains(START_MARKER) && content.contains(END_MARKER))
    }

    /// Inserts `block` into the file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be read or written.
    pub fn inject_columns(&self, block: &ColumnBlock) -> Result<(), ExtractError> {
        let content = self.read()?;
        std::fs::write(&self.path, insert_block(&content, block))?;
        log::info!(
            "Injected {} column(s) into {}",
            block.columns().len(),
            self.path.display()
        );
        Ok(())
    }

    /// Removes the column block from the file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MissingColumnBlock`] if the file has no
    /// block, or [`ExtractError::Io`] if it cannot be read or written.
    pub fn remove_columns(&self) -> Result<(), ExtractError> {
        let content = self.read()?;
        let stripped = remove_block(&content).ok_or_else(|| ExtractError::MissingColumnBlock {
            path: self.path.clone(),
        })?;
        std::fs::write(&self.path, stripped)?;
        log::info!("Removed column block from {}", self.path.display());
        Ok(())
    }
}
