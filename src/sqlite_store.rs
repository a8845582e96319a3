//! SQLite-backed [`IndexStore`].
//!
//! One index per database file at `index.path`. The file holds two tables:
//!
//! | Table | Contents |
//! |-------|----------|
//! | `meta` | a single row: format version, model, dims, corpus hash, created_at |
//! | `entries` | one row per passage in index order, vector as a BLOB of little-endian `f32` |
//!
//! Writes never touch `index.path` directly. The database is written to a
//! temporary sibling file, the connection is closed, and the finished file
//! is moved into place:
//!
//! - [`IndexStore::save`] links the temporary file to `index.path`, which
//!   fails if the path already exists. A builder that loses the race
//!   deletes its file and loads the winner's index.
//! - [`IndexStore::replace`] renames over `index.path`.
//!
//! Readers therefore only ever see complete index files, and existence of
//! the file is a reliable "index is built" signal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info, warn};
use uuid::Uuid;

use unibot_core::embedding::{blob_to_vec, vec_to_blob};
use unibot_core::error::BoxError;
use unibot_core::index::{Index, IndexEntry, IndexMeta, INDEX_FORMAT_VERSION};
use unibot_core::models::Passage;
use unibot_core::store::IndexStore;
use unibot_core::{Error, Result};

pub struct SqliteIndexStore {
    path: PathBuf,
}

impl SqliteIndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn err(&self, source: impl Into<BoxError>) -> Error {
        Error::storage(self.path.display().to_string(), source)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "index".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
    }

    /// Write `index` to a fresh temporary file and return its path.
    async fn write_temp(&self, index: &Index) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.err(e))?;
            }
        }

        let temp = self.temp_path();
        match write_database(&temp, index).await {
            Ok(()) => {
                debug!(temp = %temp.display(), entries = index.len(), "wrote index file");
                Ok(temp)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&temp);
                Err(self.err(e))
            }
        }
    }
}

async fn open(path: &Path, create: bool) -> std::result::Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .read_only(!create)
        .journal_mode(SqliteJournalMode::Delete);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

async fn write_database(path: &Path, index: &Index) -> std::result::Result<(), sqlx::Error> {
    let pool = open(path, true).await?;

    sqlx::query(
        r#"
        CREATE TABLE meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            format_version INTEGER NOT NULL,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            corpus_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE entries (
            position INTEGER PRIMARY KEY,
            source_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            start_char INTEGER NOT NULL,
            content TEXT NOT NULL,
            hash TEXT NOT NULL,
            vector BLOB NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    let meta = index.meta();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO meta (id, format_version, model, dims, corpus_hash, created_at) VALUES (1, ?, ?, ?, ?, ?)",
    )
    .bind(INDEX_FORMAT_VERSION as i64)
    .bind(&meta.model)
    .bind(meta.dims as i64)
    .bind(&meta.corpus_hash)
    .bind(meta.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    for (position, entry) in index.entries().iter().enumerate() {
        let p = &entry.passage;
        sqlx::query(
            "INSERT INTO entries (position, source_id, chunk_index, start_char, content, hash, vector) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(position as i64)
        .bind(&p.source_id)
        .bind(p.chunk_index)
        .bind(p.start_char)
        .bind(&p.content)
        .bind(&p.hash)
        .bind(vec_to_blob(&entry.vector))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    pool.close().await;
    Ok(())
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.path.is_file())
    }

    async fn load(&self) -> Result<Index> {
        let pool = open(&self.path, false).await.map_err(|e| self.err(e))?;

        let meta_row = sqlx::query(
            "SELECT format_version, model, dims, corpus_hash, created_at FROM meta WHERE id = 1",
        )
        .fetch_optional(&pool)
        .await
        .map_err(|e| self.err(e))?
        .ok_or_else(|| self.err("index file has no meta row"))?;

        let version: i64 = meta_row.get("format_version");
        if version != INDEX_FORMAT_VERSION as i64 {
            return Err(self.err(format!(
                "unsupported index format version {} (expected {}); run `unibot index rebuild`",
                version, INDEX_FORMAT_VERSION
            )));
        }

        let created_at: String = meta_row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| self.err(e))?
            .with_timezone(&Utc);
        let dims: i64 = meta_row.get("dims");

        let meta = IndexMeta {
            model: meta_row.get("model"),
            dims: dims as usize,
            corpus_hash: meta_row.get("corpus_hash"),
            created_at,
        };

        let rows = sqlx::query(
            "SELECT source_id, chunk_index, start_char, content, hash, vector FROM entries ORDER BY position ASC",
        )
        .fetch_all(&pool)
        .await
        .map_err(|e| self.err(e))?;
        pool.close().await;

        let entries: Vec<IndexEntry> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("vector");
                IndexEntry {
                    passage: Passage {
                        source_id: row.get("source_id"),
                        chunk_index: row.get("chunk_index"),
                        start_char: row.get("start_char"),
                        content: row.get("content"),
                        hash: row.get("hash"),
                    },
                    vector: blob_to_vec(&blob),
                }
            })
            .collect();

        Index::from_parts(meta, entries).map_err(|e| self.err(e))
    }

    async fn save(&self, index: Index) -> Result<Index> {
        let temp = self.write_temp(&index).await?;

        let linked = std::fs::hard_link(&temp, &self.path);
        let _ = std::fs::remove_file(&temp);
        match linked {
            Ok(()) => {
                info!(path = %self.path.display(), entries = index.len(), "saved index");
                Ok(index)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(
                    path = %self.path.display(),
                    "another process finished building the index first, loading it"
                );
                self.load().await
            }
            Err(e) => Err(self.err(e)),
        }
    }

    async fn replace(&self, index: &Index) -> Result<()> {
        let temp = self.write_temp(index).await?;
        if let Err(e) = std::fs::rename(&temp, &self.path) {
            let _ = std::fs::remove_file(&temp);
            return Err(self.err(e));
        }
        info!(path = %self.path.display(), entries = index.len(), "replaced index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index(texts: &[&str], model: &str) -> Index {
        let entries: Vec<IndexEntry> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| IndexEntry {
                passage: Passage::new("guide.md", i as i64, (i * 10) as i64, t),
                vector: vec![i as f32 + 0.1, -0.333_333_34, 1.0e-7],
            })
            .collect();
        let passages: Vec<Passage> = entries.iter().map(|e| e.passage.clone()).collect();
        let meta = IndexMeta {
            model: model.to_string(),
            dims: 3,
            corpus_hash: unibot_core::index::corpus_hash(&passages),
            created_at: Utc::now(),
        };
        Index::from_parts(meta, entries).unwrap()
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_save_then_load_is_exact() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::new(tmp.path().join("nested/index.sqlite"));
        assert!(!store.exists().await.unwrap());

        let index = sample_index(&["alpha", "beta", "gamma"], "m");
        store.save(index.clone()).await.unwrap();
        assert!(store.exists().await.unwrap());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.entries(), index.entries());
        assert_eq!(loaded.meta().model, "m");
        assert_eq!(loaded.meta().corpus_hash, index.meta().corpus_hash);
        assert_eq!(
            loaded.meta().created_at.timestamp_millis(),
            index.meta().created_at.timestamp_millis()
        );

        let query = [0.5, -0.2, 0.0];
        assert_eq!(
            loaded.search_by_vector(&query, 2).unwrap(),
            index.search_by_vector(&query, 2).unwrap()
        );
        assert!(temp_files(&tmp.path().join("nested")).is_empty());
    }

    #[tokio::test]
    async fn test_second_save_keeps_first_index() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::new(tmp.path().join("index.sqlite"));

        store.save(sample_index(&["first"], "winner")).await.unwrap();
        let result = store.save(sample_index(&["late", "x"], "loser")).await.unwrap();
        assert_eq!(result.meta().model, "winner");
        assert_eq!(result.len(), 1);
        assert_eq!(store.load().await.unwrap().meta().model, "winner");
        assert!(temp_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::new(tmp.path().join("index.sqlite"));

        store.save(sample_index(&["old"], "v1")).await.unwrap();
        store
            .replace(&sample_index(&["new", "newer"], "v2"))
            .await
            .unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.meta().model, "v2");
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_load_garbage_is_storage_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        std::fs::write(&path, "this is not a database").unwrap();
        let err = SqliteIndexStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
