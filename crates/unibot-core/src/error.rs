//! Error taxonomy shared by the core and the application.
//!
//! | Variant | Raised when | Handling |
//! |---------|-------------|----------|
//! | [`Error::Configuration`] | credentials or settings are missing/malformed | fail fast at startup |
//! | [`Error::EmptyCorpus`] | a first-time index build has no passages | propagated to the caller |
//! | [`Error::InvalidArgument`] | e.g. `k == 0`, odd history length | propagated to the caller |
//! | [`Error::Loader`] | one document failed to load | logged, document skipped |
//! | [`Error::Pipeline`] | retrieval or generation failed while answering | caller apologises, session continues |
//! | [`Error::Embedding`] | embedding failed while building an index | propagated to the caller |
//! | [`Error::Storage`] | the persisted index cannot be read or written | propagated to the caller |
//!
//! Nothing in UniBot retries: every external call is attempted once and
//! its failure surfaces through one of these variants.

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause, used to carry provider and driver errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which step of an answer call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Embedding the question or ranking passages.
    Retrieval,
    /// Invoking the language model.
    Generation,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Retrieval => write!(f, "retrieval"),
            PipelineStage::Generation => write!(f, "generation"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no document passages available to build a new index")]
    EmptyCorpus,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to load {path}: {reason}")]
    Loader { path: String, reason: String },

    #[error("{stage} failed: {source}")]
    Pipeline {
        stage: PipelineStage,
        #[source]
        source: BoxError,
    },

    #[error("embedding failed: {0}")]
    Embedding(#[source] BoxError),

    #[error("index storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub fn pipeline(stage: PipelineStage, source: impl Into<BoxError>) -> Self {
        Error::Pipeline {
            stage,
            source: source.into(),
        }
    }

    pub fn storage(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Storage {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Short stable code for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "CONFIGURATION",
            Error::EmptyCorpus => "EMPTY_CORPUS",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::Loader { .. } => "LOADER",
            Error::Pipeline { .. } => "PIPELINE",
            Error::Embedding(_) => "EMBEDDING",
            Error::Storage { .. } => "STORAGE",
        }
    }
}
