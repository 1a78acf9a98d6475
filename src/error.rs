//! Error types for the loader

use std::path::PathBuf;
use thiserror::Error;

/// Every failure is fatal for the run; nothing is retried.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed JSON in {} (record {record}): {source}", .path.display())]
    Json {
        path: PathBuf,
        record: usize,
        source: serde_json::Error,
    },

    #[error("invalid record in {} (record {record}): {reason}", .path.display())]
    InvalidRecord {
        path: PathBuf,
        record: usize,
        reason: String,
    },

    #[error("timestamp {0} ms is outside the representable range")]
    Timestamp(i64),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Io {
            path: path.into(),
            source,
        }
    }
}
