//! In-memory [`IndexStore`] for tests and embedding in other programs.
//!
//! Holds at most one index behind `std::sync::RwLock`.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::index::Index;

use super::IndexStore;

#[derive(Default)]
pub struct MemoryIndexStore {
    slot: RwLock<Option<Index>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::storage("memory", "index lock poisoned")
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn exists(&self) -> Result<bool> {
        let slot = self.slot.read().map_err(|_| Self::poisoned())?;
        Ok(slot.is_some())
    }

    async fn load(&self) -> Result<Index> {
        let slot = self.slot.read().map_err(|_| Self::poisoned())?;
        slot.clone()
            .ok_or_else(|| Error::storage("memory", "no index stored"))
    }

    async fn save(&self, index: Index) -> Result<Index> {
        let mut slot = self.slot.write().map_err(|_| Self::poisoned())?;
        match slot.as_ref() {
            Some(existing) => Ok(existing.clone()),
            None => {
                *slot = Some(index.clone());
                Ok(index)
            }
        }
    }

    async fn replace(&self, index: &Index) -> Result<()> {
        let mut slot = self.slot.write().map_err(|_| Self::poisoned())?;
        *slot = Some(index.clone());
        Ok(())
    }
}
