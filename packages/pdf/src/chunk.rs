//! Overlapping fixed-size character windows.
//!
//! Windows start every `size - overlap` characters so that an entity
//! straddling one window boundary appears whole in the next window.
//! Offsets count Unicode scalar values, so a window never splits a
//! multi-byte character.

use data_extractor_extract_models::TextChunk;

use crate::PdfError;

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Default number of characters shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 500;

/// Window length and overlap for [`chunk_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// Creates a chunking configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::InvalidChunking`] if `size` is zero or
    /// `overlap` is not smaller than `size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, PdfError> {
        if size == 0 || overlap >= size {
            return Err(PdfError::InvalidChunking { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Window length in characters.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Characters shared by consecutive windows.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Splits `text` into overlapping windows.
///
/// Windows start at character offsets `0, step, 2 * step, …` and span
/// `size` characters; the final window may be shorter. Empty text yields
/// no windows.
#[must_use]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    (0..total_chars)
        .step_by(config.step())
        .enumerate()
        .map(|(index, start)| {
            let end = (start + config.size).min(total_chars);
            TextChunk {
                index,
                offset: start,
                text: text[boundaries[start]..boundaries[end]].to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(10, 9).is_ok());
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("Leo the lion", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Leo the lion");
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn windows_follow_size_and_overlap() {
        let config = ChunkingConfig::new(10, 3).unwrap();
        for len in [1_usize, 6, 7, 8, 10, 13, 14, 20, 49, 50, 51] {
            let text: String = (0..len)
                .map(|i| char::from(b'a' + u8::try_from(i % 26).unwrap()))
                .collect();
            let chunks = chunk_text(&text, &config);

            assert_eq!(chunks.len(), len.div_ceil(config.step()), "len {len}");
            assert_eq!(chunks.last().unwrap().end(), len, "len {len}");

            for pair in chunks.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                assert_eq!(next.offset, prev.offset + config.step());
                if prev.char_len() == config.size() {
                    assert_eq!(prev.end() - next.offset, config.overlap());
                    let shared: String = prev.text.chars().skip(config.step()).collect();
                    assert!(next.text.starts_with(&shared));
                }
            }
        }
    }

    #[test]
    fn never_splits_multibyte_characters() {
        let config = ChunkingConfig::new(3, 1).unwrap();
        let chunks = chunk_text("ééééé", &config);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["ééé", "ééé", "é"]);
    }
}
