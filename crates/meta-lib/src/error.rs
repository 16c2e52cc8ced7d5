//! Error types for cache access and metadata fetching

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the compare-value cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a valid cache record
    #[error("cache file is corrupted: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("failed to serialize cache record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write cache file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while fetching a single metadata value
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch metadata for namespace {namespace}: {source:#}")]
    Request {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("metadata of namespace {0} is not a JSON object")]
    NotAnObject(String),

    #[error("meta key does not exist: {0}")]
    KeyNotFound(String),
}
