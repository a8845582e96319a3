//! Exact nearest-neighbour index over passage embeddings.
//!
//! An [`Index`] is an ordered list of (passage, vector) entries plus
//! metadata describing how it was built. It is immutable after
//! construction: a changed corpus requires a full rebuild, never an
//! in-place update.
//!
//! # Ranking
//!
//! [`Index::search`] embeds the query, scores every entry by cosine
//! similarity, and returns the top `k` in descending score order. The sort
//! is stable, so equal scores keep their insertion order.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{Error, Result};
use crate::models::{sha256_hex, Passage, ScoredPassage};

/// On-disk format version written alongside the entries.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// One stored passage and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub passage: Passage,
    pub vector: Vec<f32>,
}

/// How and from what an index was built.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    /// Embedding model that produced the vectors.
    pub model: String,
    pub dims: usize,
    /// [`corpus_hash`] of the passages at build time.
    pub corpus_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    meta: IndexMeta,
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Assemble an index from stored parts.
    ///
    /// Every vector must have `meta.dims` components.
    pub fn from_parts(meta: IndexMeta, entries: Vec<IndexEntry>) -> Result<Self> {
        if let Some((pos, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.vector.len() != meta.dims)
        {
            return Err(Error::InvalidArgument(format!(
                "entry {} has {} dimensions, index expects {}",
                pos,
                entry.vector.len(),
                meta.dims
            )));
        }
        Ok(Self { meta, entries })
    }

    /// Embed every passage and assemble a new index.
    ///
    /// Passages are sent to the embedder in batches of `batch_size`. Fails
    /// with [`Error::EmptyCorpus`] when `passages` is empty and with
    /// [`Error::Embedding`] when the embedder fails or returns vectors of
    /// the wrong count or size.
    pub async fn build(
        embedder: &dyn Embedder,
        passages: Vec<Passage>,
        batch_size: usize,
    ) -> Result<Self> {
        if passages.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let batch_size = batch_size.max(1);
        let dims = embedder.dims();
        let started = Instant::now();

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(passages.len());
        for batch in passages.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.content.clone()).collect();
            let embedded = embedder
                .embed_documents(&texts)
                .await
                .map_err(|e| Error::Embedding(e.into()))?;
            if embedded.len() != batch.len() {
                return Err(Error::Embedding(
                    format!(
                        "embedder returned {} vectors for {} passages",
                        embedded.len(),
                        batch.len()
                    )
                    .into(),
                ));
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != dims) {
                return Err(Error::Embedding(
                    format!(
                        "embedder returned a {}-dimensional vector, expected {}",
                        bad.len(),
                        dims
                    )
                    .into(),
                ));
            }
            vectors.extend(embedded);
            debug!(embedded = vectors.len(), total = passages.len(), "embedding passages");
        }

        let meta = IndexMeta {
            model: embedder.model_name().to_string(),
            dims,
            corpus_hash: corpus_hash(&passages),
            created_at: Utc::now(),
        };
        let entries = passages
            .into_iter()
            .zip(vectors)
            .map(|(passage, vector)| IndexEntry { passage, vector })
            .collect::<Vec<_>>();

        info!(
            entries = entries.len(),
            model = %meta.model,
            dims,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built index"
        );
        Ok(Self { meta, entries })
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `passages` differ from the corpus this index was built from.
    pub fn is_stale(&self, passages: &[Passage]) -> bool {
        corpus_hash(passages) != self.meta.corpus_hash
    }

    /// Top `k` passages for `query`, most similar first.
    ///
    /// `k == 0` fails with [`Error::InvalidArgument`] before the query is
    /// embedded. An embedder failure surfaces as [`Error::Embedding`].
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        validate_k(k)?;
        let query_vec = embedder
            .embed_query(query)
            .await
            .map_err(|e| Error::Embedding(e.into()))?;
        self.search_by_vector(&query_vec, k)
    }

    /// Rank entries against a pre-computed query vector.
    pub fn search_by_vector(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        validate_k(k)?;
        if query_vec.len() != self.meta.dims {
            return Err(Error::InvalidArgument(format!(
                "query vector has {} dimensions, index expects {}",
                query_vec.len(),
                self.meta.dims
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine_similarity(query_vec, &entry.vector)))
            .collect();
        // Stable: ties keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredPassage {
                passage: self.entries[pos].passage.clone(),
                score,
            })
            .collect())
    }
}

fn validate_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidArgument(
            "k must be a positive number of passages".to_string(),
        ));
    }
    Ok(())
}

/// Fingerprint of a corpus: SHA-256 over the ordered passage hashes and
/// their source ids.
pub fn corpus_hash(passages: &[Passage]) -> String {
    let mut joined = String::with_capacity(passages.len() * 72);
    for p in passages {
        joined.push_str(&p.source_id);
        joined.push('\u{0}');
        joined.push_str(&p.hash);
        joined.push('\n');
    }
    sha256_hex(joined.as_bytes())
}
