//! Storage backends for memoized results.
//!
//! Every wrapper owns exactly one [`CacheMap`]. The unbounded default is a plain `HashMap` (with
//! any hasher); with the `full` feature an `lru::LruCache` can be used to bound memory.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Minimal map interface the wrappers and the `#[memo]` attribute need from a store.
///
/// `lookup` takes `&mut self` because recency-tracking stores update their bookkeeping on reads.
pub trait CacheMap<K, V> {
    /// Returns the stored value for `key`, if any.
    fn lookup(&mut self, key: &K) -> Option<&V>;

    /// Stores `value` under `key`. An existing entry is kept as is: results of a pure function
    /// never change for the same key.
    fn remember(&mut self, key: K, value: V);

    /// Like `lookup`, but without touching recency information.
    fn holds(&self, key: &K) -> bool;

    /// Number of stored entries.
    fn entries(&self) -> usize;
}

impl<K, V, S> CacheMap<K, V> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn lookup(&mut self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn remember(&mut self, key: K, value: V) {
        self.entry(key).or_insert(value);
    }

    fn holds(&self, key: &K) -> bool {
        self.contains_key(key)
    }

    fn entries(&self) -> usize {
        self.len()
    }
}

// Bounded store; evicts the least recently used entry once full.
#[cfg(feature = "full")]
impl<K, V, S> CacheMap<K, V> for lru::LruCache<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn lookup(&mut self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn remember(&mut self, key: K, value: V) {
        if !self.contains(&key) {
            self.put(key, value);
        }
    }

    fn holds(&self, key: &K) -> bool {
        self.contains(key)
    }

    fn entries(&self) -> usize {
        self.len()
    }
}
