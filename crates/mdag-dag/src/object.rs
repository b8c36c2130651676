//! The DAG object model.
//!
//! Internally every object is a [`DagObject`] whose category is explicit.
//! On the wire an object is only `{Links, Data}`; for lists and trees `Data`
//! carries one 4-byte [`Tag`] per link, aligned by position, naming the
//! category of the child that link points to. A blob is persisted as its
//! raw bytes, everything else as its canonical encoding.

use std::fmt;

use mdag_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::codec::{self, link_hash, link_name};
use crate::error::{DagError, DagResult};

/// Width in bytes of one category tag.
pub const TAG_LEN: usize = 4;

/// Category of a DAG object, as recorded by its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Raw content: a whole small file or one chunk of a large one.
    Blob,
    /// Ordered chunks of one large file.
    List,
    /// A directory.
    Tree,
}

impl Tag {
    /// The 4-byte wire spelling.
    pub const fn as_bytes(self) -> &'static [u8; TAG_LEN] {
        match self {
            Self::Blob => b"blob",
            Self::List => b"link",
            Self::Tree => b"tree",
        }
    }

    /// Parse a 4-byte wire tag.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"blob" => Some(Self::Blob),
            b"link" => Some(Self::List),
            b"tree" => Some(Self::Tree),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::List => "link",
            Self::Tree => "tree",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference from a list or tree to a child object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Entry name; only tree entries carry one.
    #[serde(rename = "Name", default, with = "link_name")]
    pub name: Option<String>,
    /// Content address of the child.
    #[serde(rename = "Hash", with = "link_hash")]
    pub hash: ObjectId,
    /// Logical byte length of everything beneath the child.
    #[serde(rename = "Size")]
    pub size: u64,
}

impl Link {
    /// An unnamed link, as used inside lists.
    pub fn chunk(hash: ObjectId, size: u64) -> Self {
        Self {
            name: None,
            hash,
            size,
        }
    }

    /// A named link, as used inside trees.
    pub fn named(name: impl Into<String>, hash: ObjectId, size: u64) -> Self {
        Self {
            name: Some(name.into()),
            hash,
            size,
        }
    }
}

/// One child of a list or tree: the link and the category it points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub tag: Tag,
    pub link: Link,
}

impl Entry {
    pub fn new(tag: Tag, link: Link) -> Self {
        Self { tag, link }
    }
}

/// A DAG object with its category made explicit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DagObject {
    /// Raw content bytes.
    Blob(Vec<u8>),
    /// Chunks of one file, left to right. Children are blobs or lists.
    List(Vec<Entry>),
    /// Directory entries in source iteration order.
    Tree(Vec<Entry>),
}

impl DagObject {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Blob(_) => Tag::Blob,
            Self::List(_) => Tag::List,
            Self::Tree(_) => Tag::Tree,
        }
    }

    /// Child entries; empty for blobs.
    pub fn entries(&self) -> &[Entry] {
        match self {
            Self::Blob(_) => &[],
            Self::List(entries) | Self::Tree(entries) => entries,
        }
    }

    /// Bytes of content beneath this object.
    pub fn logical_size(&self) -> u64 {
        match self {
            Self::Blob(data) => data.len() as u64,
            Self::List(entries) | Self::Tree(entries) => {
                entries.iter().map(|e| e.link.size).sum()
            }
        }
    }

    /// Canonical encoding; its digest is this object's id.
    pub fn encode(&self) -> DagResult<Vec<u8>> {
        match self {
            Self::Blob(data) => encode_blob(data),
            Self::List(entries) | Self::Tree(entries) => {
                let data: Vec<u8> = entries
                    .iter()
                    .flat_map(|e| e.tag.as_bytes().iter().copied())
                    .collect();
                let links = entries.iter().map(|e| &e.link).collect();
                Ok(codec::encode_object(links, &data)?)
            }
        }
    }

    /// What gets persisted under this object's id, given its encoding.
    pub fn stored_bytes<'a>(&'a self, canonical: &'a [u8]) -> &'a [u8] {
        match self {
            Self::Blob(data) => data,
            Self::List(_) | Self::Tree(_) => canonical,
        }
    }

    /// Decode the bytes stored under `id`, which its parent says is a `tag`.
    ///
    /// Every tree entry must be named; a list read as a tree is malformed.
    /// Zero stored bytes decode as an empty list or tree: an empty blob and
    /// an empty tree share one encoding, so whichever was persisted first
    /// owns the stored value.
    pub fn decode(id: &ObjectId, tag: Tag, bytes: &[u8]) -> DagResult<Self> {
        if tag == Tag::Blob {
            return Ok(Self::Blob(bytes.to_vec()));
        }
        if bytes.is_empty() {
            return Ok(match tag {
                Tag::List => Self::List(Vec::new()),
                _ => Self::Tree(Vec::new()),
            });
        }

        let malformed = |reason: String| DagError::Malformed { id: *id, reason };
        let raw = codec::decode_object(bytes).map_err(|e| malformed(e.to_string()))?;

        if raw.data.len() != TAG_LEN * raw.links.len() {
            return Err(malformed(format!(
                "{} links but {} bytes of tags",
                raw.links.len(),
                raw.data.len()
            )));
        }

        let mut entries = Vec::with_capacity(raw.links.len());
        for (i, (link, tag_bytes)) in raw
            .links
            .into_iter()
            .zip(raw.data.chunks_exact(TAG_LEN))
            .enumerate()
        {
            let child = Tag::parse(tag_bytes).ok_or_else(|| {
                malformed(format!(
                    "link {i}: unknown tag {:?}",
                    String::from_utf8_lossy(tag_bytes)
                ))
            })?;
            if tag == Tag::List && child == Tag::Tree {
                return Err(malformed(format!("link {i}: list cannot contain a tree")));
            }
            if tag == Tag::Tree && link.name.is_none() {
                return Err(malformed(format!("link {i}: tree entry has no name")));
            }
            entries.push(Entry::new(child, link));
        }

        Ok(match tag {
            Tag::List => Self::List(entries),
            _ => Self::Tree(entries),
        })
    }
}

/// Canonical encoding of a blob holding `data`, without copying it into a
/// [`DagObject`].
pub fn encode_blob(data: &[u8]) -> DagResult<Vec<u8>> {
    Ok(codec::encode_object(Vec::new(), data)?)
}
