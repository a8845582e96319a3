//! Embedding capability and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus pure helpers for vector serialization and similarity.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `unibot`
//! application crate.

use anyhow::Result;
use async_trait::async_trait;

/// An externally supplied text embedding function.
///
/// Implementations must be deterministic for a given model configuration:
/// the same text always maps to the same vector. Every call is attempted
/// exactly once; implementations do not retry.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of passages, returning one vector per input, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            anyhow::bail!(
                "embedder returned {} vectors for a single query",
                vectors.len()
            );
        }
        Ok(vectors.remove(0))
    }
}

/// Byte layout of a stored vector: each component as 4 little-endian bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`vec_to_blob`]. A trailing group shorter than 4 bytes is dropped.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine of the angle between `a` and `b`.
///
/// Mismatched lengths, empty input and zero vectors score `0.0`.
///
/// ```rust
/// use unibot_core::embedding::cosine_similarity;
///
/// assert_eq!(cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]), 1.0);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });
    let norms = (sq_a * sq_b).sqrt();
    if norms < f32::EPSILON {
        0.0
    } else {
        dot / norms
    }
}
