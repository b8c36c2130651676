//! Reading files back out of a built DAG.
//!
//! A path is split on `/` and its first segment, the root's own name, is
//! skipped. Trees are searched by entry name; the first blob or list entry
//! matching the final segment is the file, and its content is streamed in
//! link order.
//!
//! A path that does not lead to a file is `Ok(None)`. Objects that are
//! referenced but absent, or whose bytes do not hash to their id, are errors.

use std::io::Write;

use mdag_crypto::HashAlgorithm;
use mdag_store::ObjectStore;
use mdag_types::ObjectId;
use tracing::debug;

use crate::error::{DagError, DagResult};
use crate::object::{encode_blob, DagObject, Entry, Link, Tag};

/// Reads files out of a DAG stored in `S`.
pub struct Resolver<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    hasher: &'a dyn HashAlgorithm,
    verify: bool,
}

impl<'a, S: ObjectStore + ?Sized> Resolver<'a, S> {
    /// A resolver that verifies every object it fetches.
    pub fn new(store: &'a S, hasher: &'a dyn HashAlgorithm) -> Self {
        Self {
            store,
            hasher,
            verify: true,
        }
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// The content of the file at `path` under the tree `root`.
    pub fn resolve(&self, root: &ObjectId, path: &str) -> DagResult<Option<Vec<u8>>> {
        let mut out = Vec::new();
        Ok(self.resolve_to(root, path, &mut out)?.map(|_| out))
    }

    /// Stream the file at `path` under `root` into `out`.
    ///
    /// Returns the number of bytes written, or `None` if `root` is not in
    /// the store or the path matches no file.
    pub fn resolve_to<W: Write + ?Sized>(
        &self,
        root: &ObjectId,
        path: &str,
        out: &mut W,
    ) -> DagResult<Option<u64>> {
        if !self.store.has(root)? {
            debug!(root = %root.short_hex(), "root not in store");
            return Ok(None);
        }
        let tree = self.load(root, Tag::Tree)?;
        let segments: Vec<&str> = path.split('/').collect();

        let Some(entry) = self.find_in_tree(&tree, &segments, 1)? else {
            debug!(root = %root.short_hex(), path, "path not found");
            return Ok(None);
        };
        let written = self.write_entry(&entry, out)?;
        if self.verify && written != entry.link.size {
            return Err(DagError::Malformed {
                id: entry.link.hash,
                reason: format!("produced {written} bytes, link says {}", entry.link.size),
            });
        }
        debug!(root = %root.short_hex(), path, bytes = written, "resolved");
        Ok(Some(written))
    }

    /// Find the blob or list entry named by `segments[cursor..]` under `tree`.
    ///
    /// A subtree that does not contain the rest of the path does not end the
    /// search: later siblings with the same name are still tried.
    pub fn find_in_tree(
        &self,
        tree: &DagObject,
        segments: &[&str],
        cursor: usize,
    ) -> DagResult<Option<Entry>> {
        let Some(segment) = segments.get(cursor) else {
            return Ok(None);
        };
        let last = cursor + 1 == segments.len();

        for entry in tree.entries() {
            if entry.link.name.as_deref().unwrap_or("") != *segment {
                continue;
            }
            match entry.tag {
                Tag::Tree => {
                    let child = self.load(&entry.link.hash, Tag::Tree)?;
                    if let Some(found) = self.find_in_tree(&child, segments, cursor + 1)? {
                        return Ok(Some(found));
                    }
                }
                Tag::Blob | Tag::List if last => return Ok(Some(entry.clone())),
                // A file cannot have children.
                Tag::Blob | Tag::List => {}
            }
        }
        Ok(None)
    }

    /// Fetch and decode `id`, which its parent says is a `tag`.
    pub fn load(&self, id: &ObjectId, tag: Tag) -> DagResult<DagObject> {
        let bytes = self.fetch(id)?;
        if tag == Tag::Blob {
            return Ok(DagObject::Blob(self.blob_content(id, bytes)?));
        }
        let object = DagObject::decode(id, tag, &bytes)?;
        if self.verify {
            // Zero bytes stand for the empty container, whose id is the
            // digest of its encoding.
            if bytes.is_empty() {
                self.check(id, &object.encode()?)?;
            } else {
                self.check(id, &bytes)?;
            }
        }
        Ok(object)
    }

    /// Stream the content of a blob or list entry. Returns bytes written.
    pub fn write_entry<W: Write + ?Sized>(&self, entry: &Entry, out: &mut W) -> DagResult<u64> {
        match entry.tag {
            Tag::Blob => self.write_blob(&entry.link, out),
            Tag::List => {
                let list = self.load(&entry.link.hash, Tag::List)?;
                self.write_list(&list, out)
            }
            Tag::Tree => Err(DagError::Malformed {
                id: entry.link.hash,
                reason: "a tree has no file content".into(),
            }),
        }
    }

    fn write_list<W: Write + ?Sized>(&self, list: &DagObject, out: &mut W) -> DagResult<u64> {
        let mut written = 0;
        for entry in list.entries() {
            written += self.write_entry(entry, out)?;
        }
        Ok(written)
    }

    fn write_blob<W: Write + ?Sized>(&self, link: &Link, out: &mut W) -> DagResult<u64> {
        let bytes = self.fetch(&link.hash)?;
        let data = self.blob_content(&link.hash, bytes)?;
        out.write_all(&data).map_err(DagError::Output)?;
        Ok(data.len() as u64)
    }

    /// The content of the blob `id` given what the store holds for it.
    fn blob_content(&self, id: &ObjectId, bytes: Vec<u8>) -> DagResult<Vec<u8>> {
        // The empty blob and the empty tree share an id; if the tree was
        // stored first, its encoding is what comes back.
        if !bytes.is_empty() && bytes == encode_blob(&[])? && self.hasher.digest(&bytes) == *id {
            return Ok(Vec::new());
        }
        if self.verify {
            self.check(id, &encode_blob(&bytes)?)?;
        }
        Ok(bytes)
    }

    fn fetch(&self, id: &ObjectId) -> DagResult<Vec<u8>> {
        self.store.get(id)?.ok_or(DagError::MissingObject(*id))
    }

    fn check(&self, expected: &ObjectId, canonical: &[u8]) -> DagResult<()> {
        let computed = self.hasher.digest(canonical);
        if computed != *expected {
            return Err(DagError::HashMismatch {
                expected: *expected,
                computed,
            });
        }
        Ok(())
    }
}

/// Read the file at `path` under `root`, verifying every object fetched.
pub fn resolve<S: ObjectStore + ?Sized>(
    store: &S,
    root: &ObjectId,
    path: &str,
    hasher: &dyn HashAlgorithm,
) -> DagResult<Option<Vec<u8>>> {
    Resolver::new(store, hasher).resolve(root, path)
}

#[cfg(test)]
mod tests {
    use mdag_crypto::{HashKind, Sha256Hash};
    use mdag_store::{FsObjectStore, InMemoryObjectStore};
    use proptest::prelude::*;

    use super::*;
    use crate::builder::{build, Builder};
    use crate::config::{Layout, CHUNK_SIZE};
    use crate::source::{SourceNode, SourceOptions};

    fn built(tree: &SourceNode) -> (InMemoryObjectStore, ObjectId) {
        let store = InMemoryObjectStore::new();
        let root = build(&store, tree, &Sha256Hash).unwrap();
        (store, root)
    }

    fn small_layout_tree(content: &[u8]) -> (InMemoryObjectStore, ObjectId) {
        let store = InMemoryObjectStore::new();
        let tree = SourceNode::dir("root", [SourceNode::file("f.bin", content.to_vec())]);
        let report = Builder::new(&store, &Sha256Hash)
            .with_layout(Layout::new(3, 2))
            .build(&tree)
            .unwrap();
        (store, report.root)
    }

    #[test]
    fn small_file_roundtrip() {
        let tree = SourceNode::dir("root", [SourceNode::file("hello.txt", b"abcdefghij".to_vec())]);
        let (store, root) = built(&tree);
        assert_eq!(
            resolve(&store, &root, "/hello.txt", &Sha256Hash).unwrap().unwrap(),
            b"abcdefghij"
        );
        // The first segment names the root and is not matched.
        assert_eq!(
            resolve(&store, &root, "root/hello.txt", &Sha256Hash).unwrap().unwrap(),
            b"abcdefghij"
        );
    }

    #[test]
    fn chunk_plus_one_roundtrip() {
        let content = vec![0x41u8; CHUNK_SIZE + 1];
        let tree = SourceNode::dir("root", [SourceNode::file("big", content.clone())]);
        let (store, root) = built(&tree);
        let out = resolve(&store, &root, "/big", &Sha256Hash).unwrap().unwrap();
        assert_eq!(out.len(), 262_145);
        assert_eq!(out, content);
    }

    #[test]
    fn empty_directory_resolves_nothing() {
        let (store, root) = built(&SourceNode::dir("root", []));
        assert_eq!(resolve(&store, &root, "/anything", &Sha256Hash).unwrap(), None);
    }

    #[test]
    fn nested_directories() {
        let tree = SourceNode::dir(
            "root",
            [SourceNode::dir(
                "a",
                [SourceNode::dir("b", [SourceNode::file("c.txt", b"see".to_vec())])],
            )],
        );
        let (store, root) = built(&tree);
        assert_eq!(
            resolve(&store, &root, "/a/b/c.txt", &Sha256Hash).unwrap().unwrap(),
            b"see"
        );
    }

    #[test]
    fn multi_level_roundtrip() {
        let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let (store, root) = small_layout_tree(&content);
        assert_eq!(
            resolve(&store, &root, "/f.bin", &Sha256Hash).unwrap().unwrap(),
            content
        );
    }

    #[test]
    fn wrong_segments_are_not_found() {
        let tree = SourceNode::dir(
            "root",
            [SourceNode::dir(
                "a",
                [SourceNode::dir("b", [SourceNode::file("c.txt", b"c".to_vec())])],
            )],
        );
        let (store, root) = built(&tree);
        for path in [
            "/x/b/c.txt",
            "/a/x/c.txt",
            "/a/b/x.txt",
            "/a/b",
            "/a/b/",
            "/a/b/c.txt/more",
            "/",
            "",
        ] {
            assert_eq!(resolve(&store, &root, path, &Sha256Hash).unwrap(), None, "{path}");
        }
    }

    #[test]
    fn unknown_root_is_not_found() {
        let (store, _) = built(&SourceNode::dir("root", []));
        let other = Sha256Hash.digest(b"not a root");
        assert_eq!(resolve(&store, &other, "/a", &Sha256Hash).unwrap(), None);
    }

    #[test]
    fn same_name_siblings_backtrack() {
        let tree = SourceNode::dir(
            "root",
            [
                SourceNode::dir("dup", [SourceNode::file("other", b"o".to_vec())]),
                SourceNode::dir("dup", [SourceNode::file("wanted", b"w".to_vec())]),
            ],
        );
        let (store, root) = built(&tree);
        assert_eq!(
            resolve(&store, &root, "/dup/wanted", &Sha256Hash).unwrap().unwrap(),
            b"w"
        );
    }

    #[test]
    fn empty_file_next_to_empty_dir() {
        for tree in [
            SourceNode::dir(
                "root",
                [
                    SourceNode::dir("d", []),
                    SourceNode::file("e", Vec::new()),
                ],
            ),
            SourceNode::dir(
                "root",
                [
                    SourceNode::file("e", Vec::new()),
                    SourceNode::dir("d", []),
                ],
            ),
        ] {
            let (store, root) = built(&tree);
            assert_eq!(
                resolve(&store, &root, "/e", &Sha256Hash).unwrap(),
                Some(Vec::new())
            );
            assert_eq!(resolve(&store, &root, "/d/x", &Sha256Hash).unwrap(), None);
        }
    }

    #[test]
    fn resolve_to_streams_and_counts() {
        let content: Vec<u8> = (0..50u8).collect();
        let (store, root) = small_layout_tree(&content);
        let mut out = Vec::new();
        let written = Resolver::new(&store, &Sha256Hash)
            .resolve_to(&root, "/f.bin", &mut out)
            .unwrap();
        assert_eq!(written, Some(50));
        assert_eq!(out, content);
    }

    #[test]
    fn corrupted_blob_is_detected() {
        let tree = SourceNode::dir("root", [SourceNode::file("f", b"good".to_vec())]);
        let (store, root) = built(&tree);
        let blob = Sha256Hash.digest(&encode_blob(b"good").unwrap());
        store.overwrite(blob, b"evil".to_vec());

        let err = resolve(&store, &root, "/f", &Sha256Hash).unwrap_err();
        assert!(matches!(err, DagError::HashMismatch { expected, .. } if expected == blob));

        let unchecked = Resolver::new(&store, &Sha256Hash)
            .with_verify(false)
            .resolve(&root, "/f")
            .unwrap();
        assert_eq!(unchecked.unwrap(), b"evil");
    }

    #[test]
    fn corrupted_tree_is_detected() {
        let tree = SourceNode::dir(
            "root",
            [SourceNode::dir("sub", [SourceNode::file("f", b"x".to_vec())])],
        );
        let (store, root) = built(&tree);
        let other = SourceNode::dir("sub", [SourceNode::file("f", b"y".to_vec())]);
        let other_root = build(&store, &other, &Sha256Hash).unwrap();
        let forged = store.get(&other_root).unwrap().unwrap();

        let DagObject::Tree(entries) = Resolver::new(&store, &Sha256Hash)
            .load(&root, Tag::Tree)
            .unwrap()
        else {
            panic!("expected a tree");
        };
        store.overwrite(entries[0].link.hash, forged);

        assert!(matches!(
            resolve(&store, &root, "/sub/f", &Sha256Hash),
            Err(DagError::HashMismatch { .. })
        ));
    }

    #[test]
    fn non_canonical_tree_bytes_are_detected() {
        let tree = SourceNode::dir(
            "root",
            [SourceNode::dir("sub", [SourceNode::file("f", b"x".to_vec())])],
        );
        let (store, root) = built(&tree);
        let DagObject::Tree(entries) = Resolver::new(&store, &Sha256Hash)
            .load(&root, Tag::Tree)
            .unwrap()
        else {
            panic!("expected a tree");
        };
        let sub = entries[0].link.hash;

        // Same object, different bytes.
        let canonical = store.get(&sub).unwrap().unwrap();
        let mut padded = b"{ ".to_vec();
        padded.extend_from_slice(&canonical[1..]);
        store.overwrite(sub, padded);

        assert!(matches!(
            resolve(&store, &root, "/sub/f", &Sha256Hash),
            Err(DagError::HashMismatch { expected, .. }) if expected == sub
        ));
        let unchecked = Resolver::new(&store, &Sha256Hash)
            .with_verify(false)
            .resolve(&root, "/sub/f")
            .unwrap();
        assert_eq!(unchecked.unwrap(), b"x");
    }

    #[test]
    fn list_root_is_not_a_tree() {
        let store = InMemoryObjectStore::new();
        let report = Builder::new(&store, &Sha256Hash)
            .with_layout(Layout::new(4, 8))
            .build(&SourceNode::file("big", (0..10u8).collect::<Vec<_>>()))
            .unwrap();
        assert_eq!(report.tag, Tag::List);

        for path in ["/", "x/", ""] {
            let err = resolve(&store, &report.root, path, &Sha256Hash).unwrap_err();
            assert!(matches!(err, DagError::Malformed { id, .. } if id == report.root), "{path}");
        }
    }

    #[test]
    fn missing_chunk_is_an_error() {
        let content: Vec<u8> = (0..20u8).collect();
        let (store, root) = small_layout_tree(&content);
        let chunk = Sha256Hash.digest(&encode_blob(&content[3..6]).unwrap());
        assert!(store.remove(&chunk));

        let err = resolve(&store, &root, "/f.bin", &Sha256Hash).unwrap_err();
        assert!(matches!(err, DagError::MissingObject(id) if id == chunk));
    }

    #[test]
    fn garbage_root_is_malformed() {
        let store = InMemoryObjectStore::new();
        let root = Sha256Hash.digest(b"whatever");
        store.put(&root, b"not an object").unwrap();
        let err = Resolver::new(&store, &Sha256Hash)
            .with_verify(false)
            .resolve(&root, "/a")
            .unwrap_err();
        assert!(matches!(err, DagError::Malformed { .. }));
    }

    #[test]
    fn tag_alignment_across_tree() {
        let tree = SourceNode::dir(
            "root",
            [
                SourceNode::file("small", b"s".to_vec()),
                SourceNode::file("large", vec![2u8; 40]),
                SourceNode::dir("dir", [SourceNode::file("x", b"x".to_vec())]),
            ],
        );
        let store = InMemoryObjectStore::new();
        let report = Builder::new(&store, &Sha256Hash)
            .with_layout(Layout::new(4, 3))
            .build(&tree)
            .unwrap();
        let resolver = Resolver::new(&store, &Sha256Hash);

        let mut pending = vec![(report.root, Tag::Tree)];
        while let Some((id, tag)) = pending.pop() {
            let object = resolver.load(&id, tag).unwrap();
            assert_eq!(object.tag(), tag);
            if let DagObject::List(_) | DagObject::Tree(_) = &object {
                let raw = store.get(&id).unwrap().unwrap();
                let text = String::from_utf8(raw).unwrap();
                assert!(text.contains(r#""Data":""#));
            }
            for entry in object.entries() {
                if tag == Tag::List {
                    assert_ne!(entry.tag, Tag::Tree);
                }
                pending.push((entry.link.hash, entry.tag));
            }
        }
    }

    #[test]
    fn filesystem_roundtrip() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("docs/deep")).unwrap();
        std::fs::write(src.path().join("docs/deep/notes.md"), b"# notes\n").unwrap();
        let big: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(src.path().join("data.bin"), &big).unwrap();

        let objects = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(objects.path()).unwrap();
        let hasher = HashKind::Blake3.algorithm();
        let node = SourceNode::from_path(src.path(), &SourceOptions::default()).unwrap();
        let report = Builder::new(&store, hasher)
            .with_layout(Layout::new(512, 4))
            .build(&node)
            .unwrap();

        let resolver = Resolver::new(&store, hasher);
        assert_eq!(resolver.resolve(&report.root, "/data.bin").unwrap().unwrap(), big);
        assert_eq!(
            resolver.resolve(&report.root, "/docs/deep/notes.md").unwrap().unwrap(),
            b"# notes\n"
        );
        assert_eq!(report.size, 5008);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn roundtrip_any_content(
            content in proptest::collection::vec(any::<u8>(), 0..300),
            chunk_size in 1usize..16,
            max_list_line in 2usize..6,
        ) {
            let store = InMemoryObjectStore::new();
            let tree = SourceNode::dir("r", [SourceNode::dir("d", [SourceNode::file("f", content.clone())])]);
            let report = Builder::new(&store, &Sha256Hash)
                .with_layout(Layout::new(chunk_size, max_list_line))
                .build(&tree)
                .unwrap();
            let out = resolve(&store, &report.root, "/d/f", &Sha256Hash).unwrap();
            prop_assert_eq!(out, Some(content));
        }
    }
}
