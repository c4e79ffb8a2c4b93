//! Storage primitives for the service layer
//!
//! Backing stores report infrastructure failures through [`StorageError`];
//! "not found" is never an error at this layer.

use std::path::PathBuf;

use thiserror::Error;

pub mod json_map_store;

pub use json_map_store::JsonMapStore;

/// Infrastructure failure of a backing store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
