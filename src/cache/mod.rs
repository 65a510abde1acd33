//! Cache Module
//!
//! Process-local key → decoded-item cache consulted before the index and
//! data store. Purely advisory: never the system of record, safe to clear
//! at any time, performs no I/O.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::config::CacheOptions;
use crate::index::ItemKey;

/// Cache capability
pub trait Cache {
    fn get(&mut self, key: &ItemKey) -> Option<Value>;
    fn set(&mut self, key: ItemKey, item: Value);
    fn del(&mut self, key: &ItemKey);
    fn clear(&mut self);
}

/// Build the cache variant described by the config
pub fn from_options(options: CacheOptions) -> Box<dyn Cache> {
    match options {
        CacheOptions::Lru { capacity } => Box::new(LruCache::new(capacity)),
        CacheOptions::Unbounded => Box::new(UnboundedCache::default()),
        CacheOptions::Disabled => Box::new(NoopCache),
    }
}

/// Bounded cache evicting the least-recently-used entry.
///
/// Recency is a deque of keys, front = coldest. The linear scan on touch is
/// fine at the default capacity; this is a read cache, not an index.
pub struct LruCache {
    capacity: usize,
    entries: HashMap<ItemKey, Value>,
    recency: VecDeque<ItemKey>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &ItemKey) {
        if let Some(at) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(at);
        }
        self.recency.push_back(*key);
    }
}

impl Cache for LruCache {
    fn get(&mut self, key: &ItemKey) -> Option<Value> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: ItemKey, item: Value) {
        if self.capacity == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(coldest) = self.recency.pop_front() {
                self.entries.remove(&coldest);
            }
        }

        self.entries.insert(key, item);
        self.touch(&key);
    }

    fn del(&mut self, key: &ItemKey) {
        if self.entries.remove(key).is_some() {
            if let Some(at) = self.recency.iter().position(|k| k == key) {
                self.recency.remove(at);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Plain in-memory map, no eviction
#[derive(Default)]
pub struct UnboundedCache {
    entries: HashMap<ItemKey, Value>,
}

impl Cache for UnboundedCache {
    fn get(&mut self, key: &ItemKey) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: ItemKey, item: Value) {
        self.entries.insert(key, item);
    }

    fn del(&mut self, key: &ItemKey) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Pass-through used when caching is disabled
pub struct NoopCache;

impl Cache for NoopCache {
    fn get(&mut self, _key: &ItemKey) -> Option<Value> {
        None
    }

    fn set(&mut self, _key: ItemKey, _item: Value) {}

    fn del(&mut self, _key: &ItemKey) {}

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::KEY_LEN;
    use serde_json::json;

    fn key(tag: u8) -> ItemKey {
        [tag; KEY_LEN]
    }

    #[test]
    fn lru_evicts_coldest() {
        let mut cache = LruCache::new(2);
        cache.set(key(1), json!(1));
        cache.set(key(2), json!(2));

        // touching 1 makes 2 the eviction candidate
        assert_eq!(cache.get(&key(1)), Some(json!(1)));
        cache.set(key(3), json!(3));

        assert_eq!(cache.get(&key(2)), None);
        assert_eq!(cache.get(&key(1)), Some(json!(1)));
        assert_eq!(cache.get(&key(3)), Some(json!(3)));
    }

    #[test]
    fn lru_overwrite_does_not_evict() {
        let mut cache = LruCache::new(2);
        cache.set(key(1), json!(1));
        cache.set(key(2), json!(2));
        cache.set(key(1), json!(10));

        assert_eq!(cache.get(&key(1)), Some(json!(10)));
        assert_eq!(cache.get(&key(2)), Some(json!(2)));
    }

    #[test]
    fn lru_del_and_clear() {
        let mut cache = LruCache::new(2);
        cache.set(key(1), json!(1));
        cache.del(&key(1));
        assert_eq!(cache.get(&key(1)), None);

        cache.set(key(1), json!(1));
        cache.set(key(2), json!(2));
        cache.clear();
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.get(&key(2)), None);
    }

    #[test]
    fn zero_capacity_lru_stores_nothing() {
        let mut cache = LruCache::new(0);
        cache.set(key(1), json!(1));
        assert_eq!(cache.get(&key(1)), None);
    }

    #[test]
    fn unbounded_keeps_everything() {
        let mut cache = UnboundedCache::default();
        for tag in 0..200 {
            cache.set(key(tag), json!(tag));
        }
        assert_eq!(cache.get(&key(0)), Some(json!(0)));
        assert_eq!(cache.get(&key(199)), Some(json!(199)));
    }

    #[test]
    fn noop_caches_nothing() {
        let mut cache = NoopCache;
        cache.set(key(1), json!(1));
        assert_eq!(cache.get(&key(1)), None);
    }
}
