//! Persistence errors.

use std::path::PathBuf;

use pipeline::CrosspostError;
use thiserror::Error;

/// Failures of the persistent tier.
///
/// Unreadable cache entries are not represented here; the cache evicts them
/// and reports a miss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize record for {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid store configuration: {message}")]
    InvalidConfig { message: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for CrosspostError {
    fn from(err: StoreError) -> Self {
        CrosspostError::Storage {
            message: err.to_string(),
        }
    }
}
