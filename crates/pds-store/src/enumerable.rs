// ENUMERABLE COLLECTIONS
// Set and map views with O(1) membership, insertion and removal plus
// positional enumeration.
//
// INVARIANTS:
// 1. index[values[i]] == i + 1 for every 0 <= i < length
// 2. index[v] is absent for every v not in values
// 3. removal moves the last element into the freed slot (order is not stable)
// 4. map keys are exactly the members of the key set

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::{ArrayDb, DictDb, Namespace};
use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;

/// Set backed by an array of members plus a 1-based position index.
#[derive(Debug, Clone)]
pub struct EnumerableSet<V> {
    ns: Namespace,
    values: ArrayDb<V>,
    /// 1-based positions into `values`; absence means "not a member".
    index: DictDb<V, u64>,
}

impl<V> EnumerableSet<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    pub fn new(ns: Namespace) -> Self {
        Self {
            values: ArrayDb::new(ns.child("values")),
            index: DictDb::new(ns.child("index")),
            ns,
        }
    }

    pub fn length<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<u64> {
        self.values.len(store)
    }

    pub fn is_empty<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<bool> {
        Ok(self.length(store)? == 0)
    }

    /// Member at a 0-based position.
    pub fn at<S: KeyValueStore + ?Sized>(&self, store: &S, index: u64) -> StoreResult<V> {
        match self.values.get(store, index)? {
            Some(value) => Ok(value),
            None => Err(StoreError::IndexOutOfBounds {
                index,
                length: self.length(store)?,
            }),
        }
    }

    pub fn contains<S: KeyValueStore + ?Sized>(&self, store: &S, value: &V) -> StoreResult<bool> {
        self.index.contains(store, value)
    }

    /// 0-based position of a member, `None` if absent.
    pub fn index_of<S: KeyValueStore + ?Sized>(&self, store: &S, value: &V) -> StoreResult<Option<u64>> {
        Ok(match self.index.get(store, value)? {
            Some(pos) if pos > 0 => Some(pos - 1),
            _ => None,
        })
    }

    /// Insert a member. Returns `false` if it was already present.
    pub fn add<S: KeyValueStore + ?Sized>(&self, store: &mut S, value: &V) -> StoreResult<bool> {
        if self.contains(store, value)? {
            return Ok(false);
        }
        let length = self.values.push(store, value)?;
        self.index.set(store, value, &length)?;
        Ok(true)
    }

    /// Remove a member. Returns `false` if it was not present.
    pub fn remove<S: KeyValueStore + ?Sized>(&self, store: &mut S, value: &V) -> StoreResult<bool> {
        let position = match self.index.get(store, value)? {
            Some(pos) if pos > 0 => pos,
            _ => return Ok(false),
        };

        let last = self.values.pop(store)?.ok_or_else(|| StoreError::Corrupt {
            namespace: self.ns.to_string(),
            reason: "indexed member in empty set".to_string(),
        })?;
        self.index.remove(store, value)?;

        // Unless the removed member was last, the popped one fills its slot.
        let new_length = self.values.len(store)?;
        if position <= new_length {
            self.values.set(store, position - 1, &last)?;
            self.index.set(store, &last, &position)?;
        }
        debug!("Removed member at position {} from {}", position, self.ns);
        Ok(true)
    }

    /// Members in storage order.
    pub fn values<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<Vec<V>> {
        self.range(store, 0, self.length(store)?)
    }

    /// Up to `size` members starting at the 0-based `start`.
    pub fn range<S: KeyValueStore + ?Sized>(&self, store: &S, start: u64, size: u64) -> StoreResult<Vec<V>> {
        let end = start.saturating_add(size).min(self.length(store)?);
        (start..end).map(|i| self.at(store, i)).collect()
    }
}

/// Map whose keys are tracked in an [`EnumerableSet`].
#[derive(Debug, Clone)]
pub struct EnumerableMap<K, V> {
    entries: DictDb<K, V>,
    keys: EnumerableSet<K>,
}

impl<K, V> EnumerableMap<K, V>
where
    K: Serialize + DeserializeOwned + Clone,
    V: Serialize + DeserializeOwned,
{
    pub fn new(ns: Namespace) -> Self {
        Self {
            entries: DictDb::new(ns.child("entries")),
            keys: EnumerableSet::new(ns.child("keys")),
        }
    }

    pub fn length<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<u64> {
        self.keys.length(store)
    }

    pub fn get_key<S: KeyValueStore + ?Sized>(&self, store: &S, index: u64) -> StoreResult<K> {
        self.keys.at(store, index)
    }

    pub fn get<S: KeyValueStore + ?Sized>(&self, store: &S, key: &K) -> StoreResult<Option<V>> {
        self.entries.get(store, key)
    }

    pub fn contains<S: KeyValueStore + ?Sized>(&self, store: &S, key: &K) -> StoreResult<bool> {
        self.keys.contains(store, key)
    }

    pub fn set<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &K, value: &V) -> StoreResult<()> {
        self.entries.set(store, key, value)?;
        self.keys.add(store, key)?;
        Ok(())
    }

    /// Remove an entry, returning its previous value.
    pub fn remove<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &K) -> StoreResult<Option<V>> {
        let previous = self.entries.get(store, key)?;
        self.entries.remove(store, key)?;
        self.keys.remove(store, key)?;
        Ok(previous)
    }

    /// Remove every entry, walking from the last key to the first.
    pub fn remove_all<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> StoreResult<u64> {
        let length = self.length(store)?;
        for i in (0..length).rev() {
            let key = self.keys.at(store, i)?;
            self.remove(store, &key)?;
        }
        Ok(length)
    }

    pub fn keys<S: KeyValueStore + ?Sized>(&self, store: &S) -> StoreResult<Vec<K>> {
        self.keys.values(store)
    }

    /// Up to `size` entries starting at the 0-based `start`, in key order.
    pub fn range<S: KeyValueStore + ?Sized>(&self, store: &S, start: u64, size: u64) -> StoreResult<Vec<(K, V)>> {
        let mut out = Vec::new();
        for key in self.keys.range(store, start, size)? {
            if let Some(value) = self.entries.get(store, &key)? {
                out.push((key, value));
            }
        }
        Ok(out)
    }
}
