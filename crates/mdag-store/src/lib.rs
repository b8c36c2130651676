//! Content-addressed key-value storage for the Merkle DAG.
//!
//! A store maps an [`ObjectId`](mdag_types::ObjectId) to the bytes persisted
//! under it. It never interprets those bytes: for blobs they are raw file
//! content, for lists and trees the canonical object encoding. Which is which
//! is decided by the DAG layer, not here.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- loose objects on disk, fanned out by id prefix
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writing an id that already exists is harmless: the value is a
//!    deterministic function of the id.
//! 3. Concurrent reads and writes are safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
