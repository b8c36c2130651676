use std::fmt;
use std::str::FromStr;

use mdag_types::ObjectId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 256-bit digest function used to content-address objects.
///
/// Implementations are stateless: `digest` may be called concurrently and
/// always returns the same id for the same bytes.
pub trait HashAlgorithm: Send + Sync + fmt::Debug {
    /// Short lowercase name (`"sha256"`, `"blake3"`).
    fn name(&self) -> &'static str;

    /// Hash raw bytes.
    fn digest(&self, data: &[u8]) -> ObjectId;

    /// Verify that data produces the expected object ID.
    fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.digest(data) == *expected
    }
}

/// SHA-256 (FIPS 180-4). The default, and what the legacy format used.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hash;

impl HashAlgorithm for Sha256Hash {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, data: &[u8]) -> ObjectId {
        let mut output = [0u8; 32];
        output.copy_from_slice(&Sha256::digest(data));
        ObjectId::from_hash(output)
    }
}

/// BLAKE3 with its default 32-byte output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hash;

impl HashAlgorithm for Blake3Hash {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest(&self, data: &[u8]) -> ObjectId {
        ObjectId::from_hash(*blake3::hash(data).as_bytes())
    }
}

/// Configurable selector for a built-in [`HashAlgorithm`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    #[default]
    Sha256,
    Blake3,
}

impl HashKind {
    /// The algorithm this kind selects.
    pub fn algorithm(self) -> &'static dyn HashAlgorithm {
        match self {
            Self::Sha256 => &Sha256Hash,
            Self::Blake3 => &Blake3Hash,
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm().name())
    }
}

impl FromStr for HashKind {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(HasherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}
