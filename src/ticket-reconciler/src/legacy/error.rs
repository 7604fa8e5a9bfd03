//! Legacy store error types.

use thiserror::Error;

/// Errors that can occur while reading the legacy store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("Failed to open legacy database '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A query failed.
    #[error("Legacy query failed: {0}")]
    Query(#[from] rusqlite::Error),
}
