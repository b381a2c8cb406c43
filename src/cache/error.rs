//! Error types for the cache layer.
//!
//! None of these ever reach a client: the middleware turns each one into a
//! log line and carries on as if the cache were absent.

use thiserror::Error;

/// Failures reported by a [`Storage`](super::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while reading, writing, or converting cache entries.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("cache entry encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("response body is not UTF-8 text: {0}")]
    NonTextBody(#[source] std::str::Utf8Error),

    #[error("cached status code {0} is not a known HTTP status")]
    UnknownStatus(u16),
}

pub type CacheResult<T> = Result<T, CacheError>;
