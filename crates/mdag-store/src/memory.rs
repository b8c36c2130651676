use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use mdag_types::ObjectId;

use crate::error::StoreResult;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` for
/// safe concurrent access. Every `put` that actually inserts a value is
/// counted, which makes deduplication observable.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, Vec<u8>>>,
    puts: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            puts: AtomicU64::new(0),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of `put` calls that inserted a new value.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Replace the value under `id` regardless of what is there.
    ///
    /// Content addressing makes this meaningless for well-behaved callers;
    /// it exists so corruption can be simulated.
    pub fn overwrite(&self, id: ObjectId, bytes: Vec<u8>) {
        self.objects.write().expect("lock poisoned").insert(id, bytes);
    }

    /// Drop the value under `id`. Returns `true` if it was present.
    pub fn remove(&self, id: &ObjectId) -> bool {
        self.objects.write().expect("lock poisoned").remove(id).is_some()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn has(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn put(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        // First writer wins; a racing second writer holds identical bytes.
        if !map.contains_key(id) {
            map.insert(*id, bytes.to_vec());
            self.puts.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
