//! Overlapping fixed-size text chunker.
//!
//! Splits document text into [`Passage`]s of at most `chunk_size`
//! characters, where consecutive passages from the same document share
//! exactly `chunk_overlap` characters.
//!
//! # Algorithm
//!
//! 1. If the remaining text fits in `chunk_size` characters, emit it and stop.
//! 2. Otherwise look at the next `chunk_size` characters (the window) and try
//!    the separators in priority order: paragraph break, line break,
//!    sentence end, space. The window is cut just after the **last**
//!    occurrence of the first separator found, provided the cut leaves more
//!    than `chunk_overlap` characters in the passage.
//! 3. When no separator qualifies, hard-cut at `chunk_size`.
//! 4. The next window starts `chunk_overlap` characters before the cut.
//!
//! Lengths and offsets are counted in `char`s, never bytes, so multi-byte
//! text (French accents, Arabic) is never split inside a code point.
//! Passage text is not trimmed.
//!
//! # Example
//!
//! ```rust
//! use unibot_core::chunk::Chunker;
//! use unibot_core::models::RawDocument;
//!
//! let chunker = Chunker::new(500, 50).unwrap();
//! let doc = RawDocument::new("guide.txt", "x".repeat(1200));
//! let passages = chunker.split(&[doc]);
//! assert_eq!(passages.len(), 3);
//! assert_eq!(passages[1].start_char, 450);
//! ```

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Passage, RawDocument};

/// Split points in priority order. The empty separator (hard cut) is the
/// implicit last resort.
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Splits raw documents into overlapping passages.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Requires `0 < chunk_size` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidArgument(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document, concatenating the passages in input order.
    ///
    /// Zero documents, or documents with no visible text, yield no passages.
    pub fn split(&self, documents: &[RawDocument]) -> Vec<Passage> {
        let passages: Vec<Passage> = documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect();
        debug!(
            documents = documents.len(),
            passages = passages.len(),
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "split documents into passages"
        );
        passages
    }

    /// Split a single document. Chunk indices are contiguous from 0.
    pub fn split_document(&self, doc: &RawDocument) -> Vec<Passage> {
        if doc.text.trim().is_empty() {
            warn!(source_id = %doc.source_id, "document has no text, skipping");
            return Vec::new();
        }

        let bounds = char_bounds(&doc.text);
        self.windows(&doc.text, &bounds)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                Passage::new(
                    &doc.source_id,
                    index as i64,
                    start as i64,
                    &doc.text[bounds[start]..bounds[end]],
                )
            })
            .collect()
    }

    /// Split bare text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let bounds = char_bounds(text);
        self.windows(text, &bounds)
            .into_iter()
            .map(|(start, end)| text[bounds[start]..bounds[end]].to_string())
            .collect()
    }

    /// Character ranges `[start, end)` of every passage.
    fn windows(&self, text: &str, bounds: &[usize]) -> Vec<(usize, usize)> {
        let total = bounds.len() - 1;
        let mut ranges = Vec::new();
        let mut start = 0usize;

        loop {
            if total - start <= self.chunk_size {
                ranges.push((start, total));
                break;
            }
            let end = self.find_cut(text, bounds, start);
            ranges.push((start, end));
            // end > start + chunk_overlap, so start strictly advances.
            start = end - self.chunk_overlap;
        }

        ranges
    }

    /// Choose where the window beginning at `start` ends.
    fn find_cut(&self, text: &str, bounds: &[usize], start: usize) -> usize {
        let limit = start + self.chunk_size;
        let window_start = bounds[start];
        let window = &text[window_start..bounds[limit]];
        let min_end = start + self.chunk_overlap;

        for sep in SEPARATORS {
            if let Some(pos) = window.rfind(sep) {
                let cut = char_index(bounds, window_start + pos + sep.len());
                if cut > min_end {
                    return cut;
                }
            }
        }

        limit
    }
}

/// Byte offset of every char boundary, plus `text.len()` as the final entry.
fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Map a byte offset on a char boundary back to its char index.
fn char_index(bounds: &[usize], byte: usize) -> usize {
    bounds.binary_search(&byte).unwrap_or_else(|i| i)
}
