//! Error types for snapshot persistence.
//!
//! Absence of a value is never an error: adapters return `Ok(None)` (or the
//! configured default). Everything here is a genuine failure that the caller
//! has to decide how to handle.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by persistence adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure other than "file not found".
    #[error("failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// The backing file exists but does not contain valid JSON for the value type.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The value could not be converted into JSON for storage.
    ///
    /// Raised before any I/O, so the slot keeps its previous value.
    #[error("failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A stored value could not be decoded into the requested type.
    #[error("failed to decode stored value for key {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// True when the stored bytes were present but unreadable as JSON.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Decode { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
