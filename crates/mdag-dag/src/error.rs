//! Error types for building and resolving the DAG.

use std::path::PathBuf;

use mdag_types::ObjectId;

/// Errors that can occur while building or resolving a DAG.
///
/// A path that does not resolve is not an error: resolvers return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// Canonical serialization failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The backing store failed to read or write.
    #[error("store error: {0}")]
    Store(#[from] mdag_store::StoreError),

    /// A stored object does not decode as the category its parent claims.
    #[error("malformed object {id}: {reason}")]
    Malformed {
        /// The object that failed to decode.
        id: ObjectId,
        /// What was wrong with it.
        reason: String,
    },

    /// A link points at an object the store does not hold.
    #[error("object {0} is referenced but missing from the store")]
    MissingObject(ObjectId),

    /// Fetched bytes do not hash to the id that named them.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        /// The id the object was fetched under.
        expected: ObjectId,
        /// The digest of what was actually stored.
        computed: ObjectId,
    },

    /// The source tree contains something that is neither file nor directory.
    #[error("unrecognized source node {kind} at {path}")]
    UnrecognizedSourceNode {
        /// Where it was found.
        path: PathBuf,
        /// What it is (symlink, special file, ...).
        kind: String,
    },

    /// A directory entry has a name no path can reach.
    #[error("directory {dir:?} has an entry with an empty name")]
    UnnamedSourceEntry {
        /// Name of the directory holding the entry.
        dir: String,
    },

    /// Reading the source tree failed.
    #[error("failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Chunking parameters are unusable.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Configuration could not be loaded or rendered.
    #[error("configuration error: {0}")]
    Config(String),

    /// Writing reassembled bytes to the caller's sink failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
