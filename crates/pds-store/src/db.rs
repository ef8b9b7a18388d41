// TYPED STORAGE CELLS
// Scalar, keyed and append-only array views over a KeyValueStore.
//
// Keys are built from length-prefixed segments, so no namespace can be a
// byte prefix of a sibling namespace's entries.

use std::fmt;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;

/// Hierarchical, prefix-free key space.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    path: Vec<u8>,
}

impl Namespace {
    pub fn new(root: impl AsRef<[u8]>) -> Self {
        let mut ns = Self { path: Vec::new() };
        ns.push_segment(root.as_ref());
        ns
    }

    /// Derive a nested namespace.
    pub fn child(&self, segment: impl AsRef<[u8]>) -> Self {
        let mut ns = self.clone();
        ns.push_segment(segment.as_ref());
        ns
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.path
    }

    fn push_segment(&mut self, segment: &[u8]) {
        self.path.extend_from_slice(&(segment.len() as u32).to_be_bytes());
        self.path.extend_from_slice(segment);
    }

    fn key(&self, suffix: &[u8]) -> Vec<u8> {
        self.child(suffix).path
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", hex::encode(&self.path))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.path.as_slice();
        let mut first = true;
        while rest.len() >= 4 {
            let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            let end = (4 + len).min(rest.len());
            if !first {
                f.write_str("/")?;
            }
            f.write_str(&String::from_utf8_lossy(&rest[4..end]))?;
            rest = &rest[end..];
            first = false;
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn encode<T: Serialize + ?Sized>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Single typed value.
#[derive(Debug, Clone)]
pub struct VarDb<T> {
    key: Vec<u8>,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> VarDb<T> {
    pub fn new(ns: Namespace) -> Self {
        Self {
            key: ns.path,
            _marker: PhantomData,
        }
    }

    pub fn get<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<Option<T>> {
        store.get(&self.key)?.map(|b| decode(&b)).transpose()
    }

    pub fn get_or<S: KeyValueStore + ?Sized>(&self, store: &S, default: T) -> StoreResult<T> {
        Ok(self.get(store)?.unwrap_or(default))
    }

    pub fn set<S: KeyValueStore + ?Sized>(&self, store: &mut S, value: &T) -> StoreResult<()> {
        store.put(&self.key, encode(value)?)
    }

    pub fn remove<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> StoreResult<()> {
        store.delete(&self.key)
    }
}

/// Typed key → value mapping. Keys are bincode-encoded.
pub struct DictDb<K: ?Sized, V> {
    ns: Namespace,
    _marker: PhantomData<fn(&K) -> V>,
}

impl<K: ?Sized, V> Clone for DictDb<K, V> {
    fn clone(&self) -> Self {
        Self {
            ns: self.ns.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K: ?Sized, V> fmt::Debug for DictDb<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictDb").field("ns", &self.ns).finish()
    }
}

impl<K: Serialize + ?Sized, V: Serialize + DeserializeOwned> DictDb<K, V> {
    pub fn new(ns: Namespace) -> Self {
        Self {
            ns,
            _marker: PhantomData,
        }
    }

    fn slot(&self, key: &K) -> StoreResult<Vec<u8>> {
        Ok(self.ns.key(&encode(key)?))
    }

    pub fn get<S: KeyValueStore + ?Sized>(&self, store: &S, key: &K) -> StoreResult<Option<V>> {
        store.get(&self.slot(key)?)?.map(|b| decode(&b)).transpose()
    }

    pub fn contains<S: KeyValueStore + ?Sized>(&self, store: &S, key: &K) -> StoreResult<bool> {
        Ok(store.get(&self.slot(key)?)?.is_some())
    }

    pub fn set<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &K, value: &V) -> StoreResult<()> {
        let slot = self.slot(key)?;
        store.put(&slot, encode(value)?)
    }

    pub fn remove<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &K) -> StoreResult<()> {
        let slot = self.slot(key)?;
        store.delete(&slot)
    }
}

/// Append-only array with pop and in-place overwrite.
#[derive(Debug, Clone)]
pub struct ArrayDb<V> {
    ns: Namespace,
    _marker: PhantomData<V>,
}

impl<V: Serialize + DeserializeOwned> ArrayDb<V> {
    pub fn new(ns: Namespace) -> Self {
        Self {
            ns,
            _marker: PhantomData,
        }
    }

    fn len_key(&self) -> Vec<u8> {
        self.ns.key(b"len")
    }

    fn item_key(&self, index: u64) -> Vec<u8> {
        self.ns.child(b"item").key(&index.to_be_bytes())
    }

    pub fn len<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<u64> {
        match store.get(&self.len_key())? {
            Some(bytes) => decode(&bytes),
            None => Ok(0),
        }
    }

    fn set_len<S: KeyValueStore + ?Sized>(&self, store: &mut S, len: u64) -> StoreResult<()> {
        if len == 0 {
            store.delete(&self.len_key())
        } else {
            store.put(&self.len_key(), encode(&len)?)
        }
    }

    pub fn get<S: KeyValueStore + ?Sized>(&self, store: &S, index: u64) -> StoreResult<Option<V>> {
        if index >= self.len(store)? {
            return Ok(None);
        }
        store.get(&self.item_key(index))?.map(|b| decode(&b)).transpose()
    }

    pub fn push<S: KeyValueStore + ?Sized>(&self, store: &mut S, value: &V) -> StoreResult<u64> {
        let len = self.len(store)?;
        store.put(&self.item_key(len), encode(value)?)?;
        self.set_len(store, len + 1)?;
        Ok(len + 1)
    }

    pub fn pop<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> StoreResult<Option<V>> {
        let len = self.len(store)?;
        if len == 0 {
            return Ok(None);
        }
        let key = self.item_key(len - 1);
        let value = match store.get(&key)? {
            Some(bytes) => decode(&bytes)?,
            None => {
                return Err(StoreError::Corrupt {
                    namespace: self.ns.to_string(),
                    reason: format!("missing element {}", len - 1),
                })
            }
        };
        store.delete(&key)?;
        self.set_len(store, len - 1)?;
        Ok(Some(value))
    }

    pub fn set<S: KeyValueStore + ?Sized>(&self, store: &mut S, index: u64, value: &V) -> StoreResult<()> {
        let length = self.len(store)?;
        if index >= length {
            return Err(StoreError::IndexOutOfBounds { index, length });
        }
        store.put(&self.item_key(index), encode(value)?)
    }
}
