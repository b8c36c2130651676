//! Content hashing for the Merkle DAG.
//!
//! The hash algorithm is never global: builders and resolvers receive a
//! `&dyn HashAlgorithm` per call, typically obtained from a configured
//! [`HashKind`]. All crypto operations wrap established libraries.

pub mod hasher;

pub use hasher::{Blake3Hash, HashAlgorithm, HashKind, HasherError, Sha256Hash};
