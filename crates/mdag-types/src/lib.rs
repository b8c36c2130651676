//! Foundation types for the Merkle DAG.
//!
//! Every other `mdag-*` crate depends on `mdag-types`. The only type of note
//! is [`ObjectId`]: the 32-byte digest under which an object is stored. The
//! digest algorithm is chosen by the caller (see `mdag-crypto`), so nothing in
//! this crate hashes anything.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN};
