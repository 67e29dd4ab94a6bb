//! Error types for idler-core operations.
//!
//! Most failures in this crate are branches the control flow reacts to
//! (`TransportError`, `LoadError`) rather than errors that propagate; this
//! enum covers the few operations that genuinely fail upward.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IdlerError {
    #[error("Failed to write AppID file {path}: {source}")]
    SlotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build catalog HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Convenience type alias for Results using IdlerError.
pub type Result<T> = std::result::Result<T, IdlerError>;
