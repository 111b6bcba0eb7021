//! Append-only CSV output shared by every processed document.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use data_extractor_extract_models::ExtractedRow;

use crate::ExtractError;

/// A CSV file that rows are appended to.
///
/// The header is written only when the file is empty at the time of an
/// append, so it is written once per fill: on the first append after the
/// file was created or cleared. Later appends never re-check it against
/// the rows being written.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing to `path`. Nothing is touched until the
    /// first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the output file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Whether the output file exists and holds at least one byte.
    #[must_use]
    pub fn has_content(&self) -> bool {
        std::fs::metadata(&self.path).is_ok_and(|m| m.is_file() && m.len() > 0)
    }

    /// Appends `rows`, writing `header` first if the file is empty.
    ///
    /// Creates the parent directory and the file if needed. Returns the
    /// number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be opened and
    /// [`ExtractError::Csv`] if a record cannot be written.
    pub fn append(&self, header: &[String], rows: &[ExtractedRow]) -> Result<usize, ExtractError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(file);

        if is_empty {
            log::debug!("Writing CSV header to {}", self.path.display());
            writer.write_record(header)?;
        }
        for row in rows {
            writer.write_record(row.fields())?;
        }
        writer.flush()?;

        Ok(rows.len())
    }

    /// Truncates the output file to zero bytes, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be opened for
    /// writing.
    pub fn clear(&self) -> Result<(), ExtractError> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        log::info!("Cleared {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use data_extractor_extract_models::DocumentRef;

    use super::*;

    fn header() -> Vec<String> {
        vec!["Reference_ID".into(), "Name".into(), "Count".into()]
    }

    fn row(name: &str, count: &str) -> ExtractedRow {
        ExtractedRow::new(&DocumentRef::new("doc"), vec![name.into(), count.into()])
    }

    #[test]
    fn writes_header_once_then_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("outputs").join("main.csv"));

        sink.append(&header(), &[row("Leo", "3")]).unwrap();
        sink.append(&header(), &[row("Tigris", "1"), row("Pardus", "2")])
            .unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            contents,
            "Reference_ID,Name,Count\ndoc,Leo,3\ndoc,Tigris,1\ndoc,Pardus,2\n"
        );
    }

    #[test]
    fn never_duplicates_header_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.csv");
        std::fs::write(&path, "Reference_ID,Species\nold,Lynx\n").unwrap();

        let sink = CsvSink::new(&path);
        sink.append(&header(), &[row("Leo", "3")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Reference_ID,Species\nold,Lynx\ndoc,Leo,3\n");
    }

    #[test]
    fn empty_batch_on_empty_file_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("main.csv"));
        assert_eq!(sink.append(&header(), &[]).unwrap(), 0);
        assert_eq!(
            std::fs::read_to_string(sink.path()).unwrap(),
            "Reference_ID,Name,Count\n"
        );
    }

    #[test]
    fn quotes_fields_with_delimiters_and_accepts_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("main.csv"));
        let ragged = ExtractedRow::new(
            &DocumentRef::new("doc"),
            vec!["Leo, the lion".into(), "say \"roar\"".into(), "extra".into()],
        );

        sink.append(&header(), &[ragged]).unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        assert!(contents.ends_with("doc,\"Leo, the lion\",\"say \"\"roar\"\"\",extra\n"));
    }

    #[test]
    fn clear_truncates_and_header_returns() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("main.csv"));
        sink.append(&header(), &[row("Leo", "3")]).unwrap();

        sink.clear().unwrap();
        assert!(sink.exists());
        assert!(!sink.has_content());

        sink.append(&header(), &[row("Tigris", "1")]).unwrap();
        assert_eq!(
            std::fs::read_to_string(sink.path()).unwrap(),
            "Reference_ID,Name,Count\ndoc,Tigris,1\n"
        );
    }
}
