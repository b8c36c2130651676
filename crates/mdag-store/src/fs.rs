//! Loose-object store on the local filesystem.
//!
//! On-disk layout, one file per object:
//! ```text
//! <root>/
//!   ab/
//!     cdef0123...   (remaining 62 hex chars of the id)
//! ```
//!
//! Writes go to a temporary file in the destination directory and are then
//! renamed into place, so a reader never observes a partial object and two
//! writers racing on the same id both succeed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mdag_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    sync: bool,
}

impl FsObjectStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() && !root.is_dir() {
            return Err(StoreError::InvalidRoot {
                path: root,
                reason: "not a directory".into(),
            });
        }
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened object store");
        Ok(Self { root, sync: false })
    }

    /// `fsync` every object before it is renamed into place.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// The directory this store lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// IDs of every object on disk, sorted.
    pub fn all_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        for fan in fs::read_dir(&self.root)? {
            let fan = fan?;
            if !fan.file_type()?.is_dir() {
                continue;
            }
            let prefix = fan.file_name().to_string_lossy().into_owned();
            for entry in fs::read_dir(fan.path())? {
                let name = entry?.file_name().to_string_lossy().into_owned();
                // Temp files and strays fail to parse and are ignored.
                if let Ok(id) = ObjectId::from_hex(&format!("{prefix}{name}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn write_new(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "object path has no parent"))?;
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        if self.sync {
            tmp.as_file().sync_all()?;
        }
        match tmp.persist(path) {
            Ok(_) => Ok(()),
            // Another writer got there first with the same content.
            Err(_) if path.exists() => Ok(()),
            Err(e) => Err(e.error),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn has(&self, id: &ObjectId) -> StoreResult<bool> {
        self.object_path(id)
            .try_exists()
            .map_err(|source| StoreError::Read { id: *id, source })
    }

    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.object_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { id: *id, source }),
        }
    }

    fn put(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<()> {
        let path = self.object_path(id);
        if path.exists() {
            return Ok(());
        }
        self.write_new(&path, bytes)
            .map_err(|source| StoreError::Write { id: *id, source })?;
        debug!(id = %id.short_hex(), len = bytes.len(), "object written");
        Ok(())
    }
}
