//! Document corpus discovery.
//!
//! Walks `documents.dir` recursively, keeps files that match
//! `include_globs` and none of `exclude_globs`, dispatches each to the
//! [`LoaderRegistry`] by extension, and chunks the loaded text into
//! passages.
//!
//! Loading is best-effort: unsupported files, unreadable files, loader
//! failures and files with no text are logged at `warn` and skipped, and
//! the walk continues. Files are processed in sorted order of their
//! relative path so the passage order, and with it the corpus hash, is
//! deterministic.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use unibot_core::chunk::Chunker;
use unibot_core::models::{Passage, RawDocument};
use unibot_core::{Error, Result};

use crate::config::{Config, DocumentsConfig};
use crate::loader::LoaderRegistry;

/// Always excluded, on top of the configured `exclude_globs`.
const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Outcome of one corpus walk.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<RawDocument>,
    /// Matched files with no registered loader.
    pub unsupported: usize,
    /// Files whose loader or read failed.
    pub failed: usize,
    /// Files that loaded but contain no text, e.g. scanned PDFs.
    pub empty: usize,
}

/// Walk the documents directory and load every supported file.
///
/// A missing directory yields an empty corpus (logged at `warn`); invalid
/// glob patterns are a configuration error.
pub fn load_documents(config: &DocumentsConfig, registry: &LoaderRegistry) -> Result<LoadedCorpus> {
    let root = &config.dir;
    let mut corpus = LoadedCorpus::default();

    if !root.is_dir() {
        warn!(dir = %root.display(), "documents directory does not exist");
        return Ok(corpus);
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((rel_str, path.to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    for (source_id, path) in files {
        if !registry.supports(&path) {
            warn!(file = %source_id, "no loader for this file type, skipping");
            corpus.unsupported += 1;
            continue;
        }
        match load_file(registry, &source_id, &path) {
            Ok(text) if text.trim().is_empty() => {
                warn!(file = %source_id, "document has no extractable text, skipping");
                corpus.empty += 1;
            }
            Ok(text) => {
                debug!(file = %source_id, chars = text.chars().count(), "loaded document");
                corpus.documents.push(RawDocument::new(source_id, text));
            }
            Err(e) => {
                warn!(error = %e, "failed to load document, skipping");
                corpus.failed += 1;
            }
        }
    }

    info!(
        dir = %root.display(),
        loaded = corpus.documents.len(),
        unsupported = corpus.unsupported,
        failed = corpus.failed,
        empty = corpus.empty,
        "loaded documents"
    );
    Ok(corpus)
}

fn load_file(registry: &LoaderRegistry, source_id: &str, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::Loader {
        path: source_id.to_string(),
        reason: e.to_string(),
    })?;
    registry.load(source_id, path, &bytes)
}

/// Load the configured documents and split them into passages.
pub fn collect_passages(config: &Config, registry: &LoaderRegistry) -> Result<Vec<Passage>> {
    let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
    let corpus = load_documents(&config.documents, registry)?;
    let passages = chunker.split(&corpus.documents);
    info!(
        documents = corpus.documents.len(),
        passages = passages.len(),
        chunk_size = chunker.chunk_size(),
        chunk_overlap = chunker.chunk_overlap(),
        "split documents into passages"
    );
    Ok(passages)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            Error::Configuration(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Configuration(format!("invalid glob set: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn docs_config(dir: &Path) -> DocumentsConfig {
        DocumentsConfig {
            dir: dir.to_path_buf(),
            ..DocumentsConfig::default()
        }
    }

    #[test]
    fn test_loads_supported_files_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("b.txt"), "second").unwrap();
        fs::write(tmp.path().join("a.md"), "# first").unwrap();
        fs::write(tmp.path().join("sub/c.txt"), "third").unwrap();

        let corpus = load_documents(&docs_config(tmp.path()), &LoaderRegistry::default()).unwrap();
        let ids: Vec<&str> = corpus
            .documents
            .iter()
            .map(|d| d.source_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a.md", "b.txt", "sub/c.txt"]);
        assert_eq!(corpus.documents[0].text, "# first");
    }

    #[test]
    fn test_skips_unsupported_and_broken_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("ok.txt"), "fine").unwrap();
        fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(tmp.path().join("broken.pdf"), "not a pdf").unwrap();

        let corpus = load_documents(&docs_config(tmp.path()), &LoaderRegistry::default()).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.unsupported, 1);
        assert_eq!(corpus.failed, 1);
    }

    #[test]
    fn test_globs_filter_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("keep.md"), "keep").unwrap();
        fs::write(tmp.path().join("skip.txt"), "skip").unwrap();
        fs::write(tmp.path().join("drafts/wip.md"), "wip").unwrap();

        let config = DocumentsConfig {
            dir: tmp.path().to_path_buf(),
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: vec!["drafts/**".to_string()],
            follow_symlinks: false,
        };
        let corpus = load_documents(&config, &LoaderRegistry::default()).unwrap();
        let ids: Vec<&str> = corpus
            .documents
            .iter()
            .map(|d| d.source_id.as_str())
            .collect();
        assert_eq!(ids, vec!["keep.md"]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let corpus = load_documents(
            &docs_config(&tmp.path().join("nope")),
            &LoaderRegistry::default(),
        )
        .unwrap();
        assert!(corpus.documents.is_empty());
    }

    #[test]
    fn test_invalid_glob_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let config = DocumentsConfig {
            dir: tmp.path().to_path_buf(),
            include_globs: vec!["[".to_string()],
            ..DocumentsConfig::default()
        };
        let err = load_documents(&config, &LoaderRegistry::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_collect_passages_chunks_documents() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("long.txt"), "x".repeat(1200)).unwrap();
        fs::write(tmp.path().join("blank.txt"), "   \n ").unwrap();

        let mut config = Config::default();
        config.documents = docs_config(tmp.path());
        let passages = collect_passages(&config, &LoaderRegistry::default()).unwrap();
        let starts: Vec<i64> = passages.iter().map(|p| p.start_char).collect();
        assert_eq!(starts, vec![0, 450, 900]);
        assert!(passages.iter().all(|p| p.source_id == "long.txt"));
    }

    #[test]
    fn test_blank_documents_are_counted_not_loaded() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "Office hours are on Tuesday.").unwrap();
        fs::write(tmp.path().join("blank.txt"), "   \n\n ").unwrap();
        fs::write(tmp.path().join("empty.md"), "").unwrap();

        let corpus = load_documents(&docs_config(tmp.path()), &LoaderRegistry::default()).unwrap();
        let ids: Vec<&str> = corpus
            .documents
            .iter()
            .map(|d| d.source_id.as_str())
            .collect();
        assert_eq!(ids, vec!["notes.txt"]);
        assert_eq!(corpus.empty, 2);
        assert_eq!(corpus.failed, 0);
        assert_eq!(corpus.unsupported, 0);
    }
}
