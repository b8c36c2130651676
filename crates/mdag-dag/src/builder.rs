//! Turning a source tree into persisted DAG objects.
//!
//! Files no larger than one chunk become a single blob. Larger files are cut
//! into `chunk_size` pieces and gathered under lists of at most
//! `max_list_line` links, stacked [`Layout::height`] levels deep. Directories
//! become trees whose entries keep the source iteration order.
//!
//! Every object is encoded, hashed and persisted exactly once per build; an
//! object whose id the store already holds is not written again.

use std::io::Read;
use std::path::Path;

use mdag_crypto::HashAlgorithm;
use mdag_store::ObjectStore;
use mdag_types::ObjectId;
use tracing::{debug, info};

use crate::config::Layout;
use crate::error::{DagError, DagResult};
use crate::object::{encode_blob, DagObject, Entry, Link, Tag};
use crate::source::{SourceDir, SourceFile, SourceNode};

/// Outcome of one build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildReport {
    /// Id of the object built for the source root.
    pub root: ObjectId,
    /// Category of the root object.
    pub tag: Tag,
    /// Logical bytes beneath the root.
    pub size: u64,
    /// Objects physically written.
    pub objects_written: u64,
    /// Objects skipped because the store already held them.
    pub objects_deduplicated: u64,
}

/// Builds DAGs into a store with a fixed hash algorithm and layout.
pub struct Builder<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    hasher: &'a dyn HashAlgorithm,
    layout: Layout,
}

impl<'a, S: ObjectStore + ?Sized> Builder<'a, S> {
    pub fn new(store: &'a S, hasher: &'a dyn HashAlgorithm) -> Self {
        Self {
            store,
            hasher,
            layout: Layout::default(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Build `node` and everything beneath it.
    ///
    /// The returned root id is the key the root object was persisted under.
    pub fn build(&self, node: &SourceNode) -> DagResult<BuildReport> {
        self.layout.validate()?;
        let mut session = Session {
            store: self.store,
            hasher: self.hasher,
            layout: self.layout,
            written: 0,
            deduplicated: 0,
        };
        let built = session.node(node)?;

        info!(
            root = %built.id,
            tag = %built.tag,
            size = built.size,
            written = session.written,
            deduplicated = session.deduplicated,
            hash = self.hasher.name(),
            "build complete"
        );
        Ok(BuildReport {
            root: built.id,
            tag: built.tag,
            size: built.size,
            objects_written: session.written,
            objects_deduplicated: session.deduplicated,
        })
    }
}

/// Build `node` into `store` with the default layout and return the root id.
pub fn build<S: ObjectStore + ?Sized>(
    store: &S,
    node: &SourceNode,
    hasher: &dyn HashAlgorithm,
) -> DagResult<ObjectId> {
    Ok(Builder::new(store, hasher).build(node)?.root)
}

/// A persisted object as its parent will link to it.
#[derive(Clone, Copy, Debug)]
struct Built {
    id: ObjectId,
    tag: Tag,
    size: u64,
}

struct Session<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    hasher: &'a dyn HashAlgorithm,
    layout: Layout,
    written: u64,
    deduplicated: u64,
}

impl<S: ObjectStore + ?Sized> Session<'_, S> {
    fn node(&mut self, node: &SourceNode) -> DagResult<Built> {
        match node {
            SourceNode::File(file) => self.file(file),
            SourceNode::Directory(dir) => self.dir(dir),
        }
    }

    fn dir(&mut self, dir: &SourceDir) -> DagResult<Built> {
        let mut entries = Vec::with_capacity(dir.children().len());
        for child in dir.children() {
            if child.name().is_empty() {
                return Err(DagError::UnnamedSourceEntry {
                    dir: dir.name().to_owned(),
                });
            }
            let built = self.node(child)?;
            entries.push(Entry::new(
                built.tag,
                Link::named(child.name(), built.id, built.size),
            ));
        }
        let size = entries.iter().map(|e| e.link.size).sum();
        let id = self.persist(&DagObject::Tree(entries))?;
        Ok(Built {
            id,
            tag: Tag::Tree,
            size,
        })
    }

    fn file(&mut self, file: &SourceFile) -> DagResult<Built> {
        let size = file.size();
        let origin = file.origin();
        let mut reader = file.open()?;

        let height = self.layout.height(size);
        if height == 0 {
            let data = read_chunk(&mut reader, size, &origin)?;
            let id = self.persist_blob(&data)?;
            return Ok(Built {
                id,
                tag: Tag::Blob,
                size,
            });
        }

        debug!(file = file.name(), size, height, "chunking file");
        let built = self.level(height, &mut reader, size, &origin)?;
        if built.size != size {
            return Err(DagError::InvalidLayout(format!(
                "height {height} covered {} of {size} bytes",
                built.size
            )));
        }
        Ok(built)
    }

    /// Consume up to `max_list_line^height` chunks of the `remaining` bytes
    /// from `reader`. The result's `size` is the byte count consumed.
    fn level(
        &mut self,
        height: u32,
        reader: &mut dyn Read,
        remaining: u64,
        origin: &Path,
    ) -> DagResult<Built> {
        let chunk = self.layout.chunk_size as u64;
        let fan_out = self.layout.max_list_line;

        if height == 1 && remaining < chunk {
            let data = read_chunk(reader, remaining, origin)?;
            let id = self.persist_blob(&data)?;
            return Ok(Built {
                id,
                tag: Tag::Blob,
                size: remaining,
            });
        }

        let mut entries = Vec::new();
        let mut consumed = 0u64;
        while consumed < remaining && entries.len() < fan_out {
            let child = if height == 1 {
                let len = chunk.min(remaining - consumed);
                let data = read_chunk(reader, len, origin)?;
                Built {
                    id: self.persist_blob(&data)?,
                    tag: Tag::Blob,
                    size: len,
                }
            } else {
                self.level(height - 1, reader, remaining - consumed, origin)?
            };
            consumed += child.size;
            entries.push(Entry::new(child.tag, Link::chunk(child.id, child.size)));
        }

        let id = self.persist(&DagObject::List(entries))?;
        Ok(Built {
            id,
            tag: Tag::List,
            size: consumed,
        })
    }

    fn persist_blob(&mut self, data: &[u8]) -> DagResult<ObjectId> {
        let canonical = encode_blob(data)?;
        self.store_object(Tag::Blob, &canonical, data)
    }

    fn persist(&mut self, object: &DagObject) -> DagResult<ObjectId> {
        let canonical = object.encode()?;
        self.store_object(object.tag(), &canonical, object.stored_bytes(&canonical))
    }

    fn store_object(&mut self, tag: Tag, canonical: &[u8], stored: &[u8]) -> DagResult<ObjectId> {
        let id = self.hasher.digest(canonical);
        if self.store.has(&id)? {
            self.deduplicated += 1;
            debug!(id = %id.short_hex(), %tag, "object already stored");
        } else {
            self.store.put(&id, stored)?;
            self.written += 1;
            debug!(id = %id.short_hex(), %tag, len = stored.len(), "object stored");
        }
        Ok(id)
    }
}

fn read_chunk(reader: &mut dyn Read, len: u64, origin: &Path) -> DagResult<Vec<u8>> {
    let len = usize::try_from(len).map_err(|_| DagError::InvalidLayout(format!(
        "chunk of {len} bytes does not fit in memory"
    )))?;
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|source| DagError::SourceRead {
            path: origin.to_path_buf(),
            source,
        })?;
    Ok(buf)
}
