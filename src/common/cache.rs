//! In-memory keyed cache shared between nodes and the engine context.
//!
//! Uses moka's concurrent cache implementation.

use moka::sync::Cache;

/// Thread-safe in-memory map. Built without a capacity bound, so entries
/// stay until removed.
///
/// Used for storing:
/// - Pattern images by path (`MemCache<String, Arc<Image>>`)
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`].
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    pub fn contains(
        &self,
        key: &K,
    ) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(
        &self,
        key: &K,
    ) {
        self.entries.remove(key);
    }
}
