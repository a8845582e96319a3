//! Core data types that flow through ingestion and retrieval.

use sha2::{Digest, Sha256};

/// Text extracted from one file, before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Path of the file relative to the documents directory.
    pub source_id: String,
    pub text: String,
}

impl RawDocument {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// A bounded span of a document's text; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// Originating file.
    pub source_id: String,
    /// Position of this passage within its document, contiguous from 0.
    pub chunk_index: i64,
    /// Character offset of the passage within the document text.
    pub start_char: i64,
    pub content: String,
    /// SHA-256 of `content`, lowercase hex.
    pub hash: String,
}

impl Passage {
    pub fn new(source_id: &str, chunk_index: i64, start_char: i64, content: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            chunk_index,
            start_char,
            content: content.to_string(),
            hash: sha256_hex(content.as_bytes()),
        }
    }
}

/// A passage returned from a search, with its cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
