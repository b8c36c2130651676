use std::fs;
use std::path::Path;

use mdag_crypto::HashKind;
use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};
use crate::source::SourceOptions;

/// Largest file stored as a single blob, and the size of every full chunk.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Maximum number of links in one list.
pub const MAX_LISTLINE: usize = 4096;

/// Chunking parameters for large files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Bytes per chunk.
    pub chunk_size: usize,
    /// Fan-out bound of every list level.
    pub max_list_line: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_list_line: MAX_LISTLINE,
        }
    }
}

impl Layout {
    pub fn new(chunk_size: usize, max_list_line: usize) -> Self {
        Self {
            chunk_size,
            max_list_line,
        }
    }

    pub fn validate(&self) -> DagResult<()> {
        if self.chunk_size == 0 {
            return Err(DagError::InvalidLayout("chunk_size must be positive".into()));
        }
        if self.max_list_line < 2 {
            return Err(DagError::InvalidLayout(format!(
                "max_list_line must be at least 2, got {}",
                self.max_list_line
            )));
        }
        Ok(())
    }

    /// Number of list levels above the chunks of a file of `size` bytes.
    ///
    /// Zero means the file fits in one blob. Otherwise this is the smallest
    /// `h` with `max_list_line^h >= ceil(size / chunk_size)`.
    pub fn height(&self, size: u64) -> u32 {
        let chunk = self.chunk_size as u64;
        if size <= chunk {
            return 0;
        }
        let chunks = size.div_ceil(chunk);
        let fan_out = self.max_list_line as u64;
        let mut height = 1;
        let mut capacity = fan_out;
        while capacity < chunks {
            capacity = capacity.saturating_mul(fan_out);
            height += 1;
        }
        height
    }
}

/// Everything a build or resolve can be tuned with.
///
/// Loaded from TOML; missing keys take their defaults:
///
/// ```toml
/// hash = "sha256"
/// verify = true
///
/// [layout]
/// chunk_size = 262144
/// max_list_line = 4096
///
/// [source]
/// sort_entries = true
/// follow_symlinks = false
/// special_files = "fail"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Digest used to address objects.
    pub hash: HashKind,
    /// Re-hash every object fetched while resolving.
    pub verify: bool,
    pub layout: Layout,
    pub source: SourceOptions,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            hash: HashKind::default(),
            verify: true,
            layout: Layout::default(),
            source: SourceOptions::default(),
        }
    }
}

impl DagConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> DagResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| DagError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), hash = %config.hash, "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> DagResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| DagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> DagResult<String> {
        toml::to_string_pretty(self).map_err(|e| DagError::Config(e.to_string()))
    }

    pub fn validate(&self) -> DagResult<()> {
        self.layout.validate()
    }
}
