//! Merkle DAG over file trees.
//!
//! [`Builder`] walks a [`SourceNode`] tree and persists it as immutable,
//! content-addressed objects: blobs of file content, lists that chunk large
//! files under a bounded fan-out, and trees for directories. [`Resolver`]
//! takes the root id back, plus a `/`-separated path, and reassembles the
//! file's bytes in their original order.
//!
//! Identical content always encodes and hashes identically, so rebuilding an
//! unchanged tree writes nothing new.

mod codec;

pub mod builder;
pub mod config;
pub mod error;
pub mod object;
pub mod resolver;
pub mod source;

pub use builder::{build, BuildReport, Builder};
pub use codec::GoJsonFormatter;
pub use config::{DagConfig, Layout, CHUNK_SIZE, MAX_LISTLINE};
pub use error::{DagError, DagResult};
pub use object::{encode_blob, DagObject, Entry, Link, Tag, TAG_LEN};
pub use resolver::{resolve, Resolver};
pub use source::{SourceDir, SourceFile, SourceNode, SourceOptions, SpecialFilePolicy};
