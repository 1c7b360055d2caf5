use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A single file could not be turned into records. Logged and skipped by the indexer.
#[derive(Debug, Error)]
#[error("failed to process {}: {source}", path.display())]
pub struct ProcessingError {
    pub path: PathBuf,
    #[source]
    pub source: anyhow::Error,
}

impl ProcessingError {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Failure talking to the summarization or captioning service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {message}")]
    Request { service: &'static str, message: String },

    #[error("{service} timed out after {}s", after.as_secs())]
    Timeout {
        service: &'static str,
        after: Duration,
    },

    #[error("{service} returned an unusable response: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

/// Errors surfaced by the query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("vector store not loaded")]
    StoreNotLoaded,

    #[error("failed to load vector store: {0}")]
    StoreLoad(#[source] anyhow::Error),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("failed to embed query: {0}")]
    Embedding(#[source] anyhow::Error),
}

/// Problems reading persisted index metadata. Callers treat all of these as "start fresh".
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("metadata version {found} does not match {expected}")]
    VersionMismatch { found: String, expected: String },
}

/// Errors that abort a whole indexing run. Per-file failures never end up here.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("an indexing run is already in progress")]
    AlreadyRunning,

    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("vector store update failed: {0}")]
    Store(#[source] anyhow::Error),

    #[error("failed to persist index: {0}")]
    Persist(#[source] anyhow::Error),
}
