use std::path::PathBuf;

use thiserror::Error;

/// Failures of the durable key-value medium.
#[derive(Debug, Error)]
pub enum MediumError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write refused for key '{key}': {reason}")]
    WriteRefused { key: String, reason: String },
}

impl MediumError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Recoverable store failures.
///
/// None of these are fatal: a load failure yields an empty store, and a write
/// failure leaves the in-memory state applied but not yet durable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read conversations from durable storage: {source}")]
    Load {
        #[source]
        source: MediumError,
    },

    #[error("stored conversations payload is corrupt: {source}")]
    Corrupt {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize conversations: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write conversations to durable storage: {source}")]
    Write {
        #[source]
        source: MediumError,
    },
}
