use std::path::PathBuf;

use mdag_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading an object from the backend failed.
    #[error("failed to read object {id}: {source}")]
    Read {
        id: ObjectId,
        #[source]
        source: std::io::Error,
    },

    /// Writing an object to the backend failed.
    #[error("failed to write object {id}: {source}")]
    Write {
        id: ObjectId,
        #[source]
        source: std::io::Error,
    },

    /// I/O error not tied to a single object (opening the store, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store root exists but cannot be used.
    #[error("invalid store root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
