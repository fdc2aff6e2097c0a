use std::hash::Hash;

use indexmap::IndexMap;

pub const DEFAULT_CAPACITY: usize = 512;

/// Fixed-capacity map that evicts the least-recently-used entry.
///
/// Entries are kept in access order: index 0 is the least recently used,
/// the last index the most recently used. No locking; callers serialize access.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    max_size: usize,
    entries: IndexMap<K, V>,
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: IndexMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value and promotes `key` to most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let index = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, value)| value)
    }

    /// Inserts or replaces; replacing also resets recency.
    pub fn set(&mut self, key: K, value: V) {
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);

        if self.entries.len() > self.max_size {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn delete(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<K: Hash + Eq, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
