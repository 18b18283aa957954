//! Persistence errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// State (de)serialization failed.
    #[error("serialization error for {path}: {source}")]
    Serde {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The requested session has no saved state.
    #[error("session {session} not found under {root}")]
    SessionNotFound {
        /// The missing session.
        session: String,
        /// The store root.
        root: PathBuf,
    },
}
