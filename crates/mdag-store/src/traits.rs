use mdag_types::ObjectId;

use crate::error::StoreResult;

/// Content-addressed key-value store.
///
/// All implementations must satisfy these invariants:
/// - Values are immutable once written. A `put` for an id that is already
///   present may be skipped or may overwrite with identical bytes; either is
///   correct.
/// - Concurrent `has`-then-`put` from independent callers never corrupts an
///   entry.
/// - The store never interprets values.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Check whether a value exists under `id`.
    fn has(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read the value stored under `id`.
    ///
    /// Returns `Ok(None)` if nothing is stored under `id`.
    /// Returns `Err` on I/O failure.
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>>;

    /// Store `bytes` under `id`.
    fn put(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    fn has(&self, id: &ObjectId) -> StoreResult<bool> {
        (**self).has(id)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(id)
    }

    fn put(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<()> {
        (**self).put(id, bytes)
    }
}
