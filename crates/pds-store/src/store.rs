// KEY-VALUE STORE
// Byte-level persistence seam with a transactional overlay.
//
// INVARIANTS:
// 1. A StoreTransaction never touches the backing store before commit()
// 2. Reads through a transaction observe its own pending writes first
// 3. Dropping an uncommitted transaction discards every pending write
// 4. commit() applies writes in key order

use std::collections::BTreeMap;

use log::debug;

use crate::error::StoreResult;

/// Minimal byte-oriented persistence capability.
///
/// Any durable backend conforms by implementing these three calls; the
/// typed collections in this crate only ever go through this trait.
pub trait KeyValueStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()>;
    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        (**self).delete(key)
    }
}

/// Ordered in-memory backend.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Write overlay over a backing store.
///
/// `None` in the pending map marks a deletion.
pub struct StoreTransaction<'a, S: KeyValueStore + ?Sized> {
    inner: &'a mut S,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KeyValueStore + ?Sized> StoreTransaction<'a, S> {
    pub fn begin(inner: &'a mut S) -> Self {
        Self {
            inner,
            pending: BTreeMap::new(),
        }
    }

    /// Number of keys touched so far.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Apply every pending write to the backing store.
    pub fn commit(self) -> StoreResult<usize> {
        let Self { inner, pending } = self;
        let count = pending.len();
        for (key, value) in pending {
            match value {
                Some(bytes) => inner.put(&key, bytes)?,
                None => inner.delete(&key)?,
            }
        }
        debug!("Committed {} store writes", count);
        Ok(count)
    }

    /// Discard all pending writes.
    pub fn rollback(self) {
        debug!("Rolled back {} pending store writes", self.pending.len());
    }
}

impl<'a, S: KeyValueStore + ?Sized> KeyValueStore for StoreTransaction<'a, S> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.inner.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.pending.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }
}
