//! Index persistence abstraction.
//!
//! The [`IndexStore`] trait is the seam between the build-once/load-after
//! lifecycle and a concrete storage backend (SQLite in the application,
//! [`memory::MemoryIndexStore`] for tests).
//!
//! # Lifecycle
//!
//! | Situation | [`get_or_create`] does |
//! |-----------|------------------------|
//! | index exists at the store location | load it; never embed, never validate |
//! | no index, passages supplied | embed, persist, return |
//! | no index, no passages | fail with [`Error::EmptyCorpus`] |
//!
//! Existence at the location is the only build-vs-load signal. When the
//! loaded index was built from a different corpus than the one supplied, a
//! warning is logged; rebuilding is always a manual decision
//! ([`rebuild`]). Callers that only need the stored index may pass no
//! passages, which skips the comparison.

pub mod memory;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::models::Passage;

/// Storage backend for a single persisted [`Index`].
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;

    /// Whether an index is present at the location.
    async fn exists(&self) -> Result<bool>;

    /// Read the stored index.
    async fn load(&self) -> Result<Index>;

    /// Persist a freshly built index if the location is still empty.
    ///
    /// Returns the index that ends up at the location: `index` itself, or
    /// the one written by a concurrent builder that finished first.
    async fn save(&self, index: Index) -> Result<Index>;

    /// Persist `index`, replacing whatever is stored.
    async fn replace(&self, index: &Index) -> Result<()>;
}

/// Load the index if one is stored, otherwise build it from `passages`.
pub async fn get_or_create(
    store: &dyn IndexStore,
    embedder: &dyn Embedder,
    passages: Vec<Passage>,
    batch_size: usize,
) -> Result<Index> {
    if store.exists().await? {
        info!(location = %store.location(), "loading existing index");
        let index = store.load().await?;
        if !passages.is_empty() && index.is_stale(&passages) {
            warn!(
                location = %store.location(),
                "documents changed since the index was built; run `unibot index rebuild` to refresh it"
            );
        }
        info!(entries = index.len(), model = %index.meta().model, "index loaded");
        return Ok(index);
    }

    if passages.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    info!(
        location = %store.location(),
        passages = passages.len(),
        "no index found, building a new one"
    );
    let index = Index::build(embedder, passages, batch_size).await?;
    store.save(index).await
}

/// Build a new index from `passages` and overwrite the stored one.
pub async fn rebuild(
    store: &dyn IndexStore,
    embedder: &dyn Embedder,
    passages: Vec<Passage>,
    batch_size: usize,
) -> Result<Index> {
    if passages.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    info!(location = %store.location(), passages = passages.len(), "rebuilding index");
    let index = Index::build(embedder, passages, batch_size).await?;
    store.replace(&index).await?;
    Ok(index)
}
