//! The source tree a DAG is built from.
//!
//! A [`SourceNode`] is either a file or a directory. Trees can be assembled
//! in memory or loaded from disk with [`SourceNode::from_path`]; disk-backed
//! files are only opened when the builder reaches them.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{DagError, DagResult};

/// What to do with entries that are neither files nor directories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialFilePolicy {
    /// Abort the load with [`DagError::UnrecognizedSourceNode`].
    #[default]
    Fail,
    /// Leave the entry out of the tree.
    Skip,
}

/// How a filesystem tree is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Order directory entries by name. When off, the platform's native
    /// iteration order is kept, and so the root hash may differ between
    /// machines.
    pub sort_entries: bool,
    /// Build symlink targets instead of treating links as special files.
    pub follow_symlinks: bool,
    pub special_files: SpecialFilePolicy,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            sort_entries: true,
            follow_symlinks: false,
            special_files: SpecialFilePolicy::Fail,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Content {
    Memory(Vec<u8>),
    Disk(PathBuf),
}

/// A file: a name, a logical size and a way to read its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    size: u64,
    content: Content,
}

impl SourceFile {
    /// A file whose bytes are already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            content: Content::Memory(bytes),
        }
    }

    /// A file read from `path` on demand. `size` bytes are consumed.
    pub fn on_disk(name: impl Into<String>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            content: Content::Disk(path.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Where the bytes come from, for error reporting.
    pub fn origin(&self) -> PathBuf {
        match &self.content {
            Content::Memory(_) => PathBuf::from(&self.name),
            Content::Disk(path) => path.clone(),
        }
    }

    /// A reader over the file's bytes.
    pub fn open(&self) -> DagResult<Box<dyn Read + '_>> {
        match &self.content {
            Content::Memory(bytes) => Ok(Box::new(bytes.as_slice())),
            Content::Disk(path) => {
                let file = File::open(path).map_err(|source| DagError::SourceRead {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(file.take(self.size)))
            }
        }
    }
}

/// A directory and its children, in the order they will be built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceDir {
    name: String,
    children: Vec<SourceNode>,
}

impl SourceDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Into<SourceNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn push(&mut self, child: impl Into<SourceNode>) {
        self.children.push(child.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[SourceNode] {
        &self.children
    }

    /// Sum of the sizes of every file beneath this directory.
    pub fn size(&self) -> u64 {
        self.children.iter().map(SourceNode::size).sum()
    }
}

/// One node of a source tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceNode {
    File(SourceFile),
    Directory(SourceDir),
}

impl SourceNode {
    /// Shorthand for an in-memory file.
    pub fn file(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::File(SourceFile::from_bytes(name, bytes))
    }

    /// Shorthand for a directory with the given children.
    pub fn dir(name: impl Into<String>, children: impl IntoIterator<Item = SourceNode>) -> Self {
        Self::Directory(SourceDir {
            name: name.into(),
            children: children.into_iter().collect(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => f.name(),
            Self::Directory(d) => d.name(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::File(f) => f.size(),
            Self::Directory(d) => d.size(),
        }
    }

    /// Load the file or directory tree at `root`.
    pub fn from_path(root: impl AsRef<Path>, options: &SourceOptions) -> DagResult<Self> {
        let root = root.as_ref();
        let mut walker = WalkDir::new(root).follow_links(options.follow_symlinks);
        if options.sort_entries {
            walker = walker.sort_by_file_name();
        }

        // Open directories, innermost last. An entry at depth `d` belongs to
        // `stack[d - 1]`.
        let mut stack: Vec<SourceDir> = Vec::new();
        let mut files = 0usize;

        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            let depth = entry.depth();
            while stack.len() > depth.max(1) {
                close_dir(&mut stack);
            }

            let name = entry_name(&entry, root)?;
            let file_type = entry.file_type();

            let node = if file_type.is_dir() {
                stack.push(SourceDir::new(name));
                continue;
            } else if file_type.is_file() {
                let size = entry.metadata().map_err(walk_error)?.len();
                files += 1;
                SourceNode::File(SourceFile::on_disk(name, entry.path(), size))
            } else {
                let kind = if file_type.is_symlink() {
                    "symlink"
                } else {
                    "special file"
                };
                match options.special_files {
                    SpecialFilePolicy::Fail => {
                        return Err(DagError::UnrecognizedSourceNode {
                            path: entry.path().to_path_buf(),
                            kind: kind.into(),
                        });
                    }
                    SpecialFilePolicy::Skip => {
                        warn!(path = %entry.path().display(), kind, "skipping source entry");
                        continue;
                    }
                }
            };

            match stack.last_mut() {
                Some(parent) => parent.push(node),
                None => return Ok(node),
            }
        }

        while stack.len() > 1 {
            close_dir(&mut stack);
        }
        let root_dir = stack.pop().ok_or_else(|| DagError::UnrecognizedSourceNode {
            path: root.to_path_buf(),
            kind: "skipped root".into(),
        })?;
        debug!(root = %root.display(), files, "loaded source tree");
        Ok(SourceNode::Directory(root_dir))
    }
}

impl From<SourceFile> for SourceNode {
    fn from(file: SourceFile) -> Self {
        Self::File(file)
    }
}

impl From<SourceDir> for SourceNode {
    fn from(dir: SourceDir) -> Self {
        Self::Directory(dir)
    }
}

/// Pop the innermost open directory into its parent. The root stays open.
fn close_dir(stack: &mut Vec<SourceDir>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(done) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.push(done);
        }
    }
}

fn entry_name(entry: &walkdir::DirEntry, root: &Path) -> DagResult<String> {
    if entry.depth() == 0 {
        return Ok(root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default());
    }
    entry
        .file_name()
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| DagError::SourceRead {
            path: entry.path().to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
        })
}

fn walk_error(err: walkdir::Error) -> DagError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
    DagError::SourceRead { path, source }
}
