//! Resource Cache
//!
//! Content-addressed, reference-counted store for derived native objects.
//! One [`ResourceCache`] exists per category (render-target sets, vertex-input
//! sets, samplers, binding sets, global-state blocks, shaders, programs).
//!
//! # Lookup
//!
//! Entries live in a [`SlotMap`] arena and are found through an `FxHashMap`
//! from canonical key to arena key. Two requests with structurally equal keys
//! resolve to the same entry; the factory only runs on a miss.
//!
//! # Use Counts
//!
//! Every successful [`get_or_create`](ResourceCache::get_or_create) adds one
//! use. [`release`](ResourceCache::release) removes one and, when the count
//! reaches zero, drops the entry from both maps and hands the value back so
//! the caller can destroy the native object. Nothing else evicts an entry.
//!
//! # Failures
//!
//! A failing factory leaves the cache untouched: a later identical request
//! runs the factory again.

pub mod keys;

use std::hash::Hash;

use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap};

struct CacheEntry<K, V> {
    key: K,
    value: V,
    uses: u32,
}

/// Content-addressed store of `V` keyed by `K`, addressed by `Id`.
pub struct ResourceCache<Id: Key, K, V> {
    label: &'static str,
    entries: SlotMap<Id, CacheEntry<K, V>>,
    lookup: FxHashMap<K, Id>,
}

impl<Id: Key, K: Hash + Eq + Clone, V> ResourceCache<Id, K, V> {
    /// Creates an empty cache. `label` names the category in logs and panics.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self { label, entries: SlotMap::with_key(), lookup: FxHashMap::default() }
    }

    // ─── Acquire / Release ───────────────────────────────────────────────────

    /// Returns the entry for `key`, creating it with `factory` on a miss.
    ///
    /// The returned id carries one new use either way.
    pub fn get_or_create<E>(&mut self, key: K, factory: impl FnOnce(&K) -> Result<V, E>) -> Result<Id, E> {
        if let Some(&id) = self.lookup.get(&key) {
            let entry = &mut self.entries[id];
            entry.uses += 1;
            log::trace!("{} cache hit ({} uses)", self.label, entry.uses);
            return Ok(id);
        }

        let value = factory(&key)?;
        let id = self.entries.insert(CacheEntry { key: key.clone(), value, uses: 1 });
        self.lookup.insert(key, id);
        log::debug!("{} cache: created entry ({} live)", self.label, self.entries.len());
        Ok(id)
    }

    /// Drops one use of `id`. Returns the value once the last use is gone.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a live entry. A double release means the
    /// counts no longer match the native objects and cannot be recovered.
    pub fn release(&mut self, id: Id) -> Option<V> {
        match self.entries.get_mut(id) {
            Some(entry) if entry.uses > 1 => {
                entry.uses -= 1;
                log::trace!("{} cache release ({} uses left)", self.label, entry.uses);
                None
            }
            Some(_) => {
                let entry = self.entries.remove(id)?;
                self.lookup.remove(&entry.key);
                log::debug!("{} cache: evicted entry ({} live)", self.label, self.entries.len());
                Some(entry.value)
            }
            None => panic!("{} cache: released an entry that is not live", self.label),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Value of a live entry.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a live entry.
    #[must_use]
    pub fn get(&self, id: Id) -> &V {
        match self.entries.get(id) {
            Some(entry) => &entry.value,
            None => panic!("{} cache: unknown identity", self.label),
        }
    }

    #[must_use]
    pub fn try_get(&self, id: Id) -> Option<&V> {
        self.entries.get(id).map(|entry| &entry.value)
    }

    /// Current use count, or `None` once the entry is gone.
    #[must_use]
    pub fn use_count(&self, id: Id) -> Option<u32> {
        self.entries.get(id).map(|entry| entry.uses)
    }

    /// Id of the live entry for `key`, without adding a use.
    #[must_use]
    pub fn find(&self, key: &K) -> Option<Id> {
        self.lookup.get(key).copied()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: Id) -> bool {
        self.entries.contains_key(id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Iterates live entries as `(id, value, uses)`.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &V, u32)> {
        self.entries.iter().map(|(id, entry)| (id, &entry.value, entry.uses))
    }
}

#[cfg(test)]
mod tests {
    use slotmap::new_key_type;

    use super::*;

    new_key_type! {
        struct TestId;
    }

    fn cache() -> ResourceCache<TestId, (u32, u32), String> {
        ResourceCache::new("test")
    }

    #[test]
    fn test_equal_keys_share_one_entry() {
        let mut cache = cache();
        let mut built = 0;
        let mut factory = |key: &(u32, u32)| -> Result<String, ()> {
            built += 1;
            Ok(format!("{key:?}"))
        };

        let a = cache.get_or_create((1, 2), &mut factory).unwrap();
        let b = cache.get_or_create((1, 2), &mut factory).unwrap();
        let c = cache.get_or_create((2, 1), &mut factory).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(built, 2);
        assert_eq!(cache.use_count(a), Some(2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_release_returns_value_at_zero() {
        let mut cache = cache();
        let id = cache.get_or_create((7, 7), |_| Ok::<_, ()>("seven".to_string())).unwrap();
        cache
            .get_or_create((7, 7), |_| -> Result<String, ()> { panic!("factory ran on a hit") })
            .unwrap();

        assert_eq!(cache.release(id), None);
        assert_eq!(cache.use_count(id), Some(1));
        assert_eq!(cache.release(id).as_deref(), Some("seven"));
        assert!(cache.is_empty());
        assert_eq!(cache.find(&(7, 7)), None);
    }

    #[test]
    fn test_failed_factory_inserts_nothing() {
        let mut cache = cache();
        let err = cache.get_or_create((1, 1), |_| Err("boom")).unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());

        let mut retried = false;
        cache
            .get_or_create((1, 1), |_| {
                retried = true;
                Ok::<_, &str>("ok".to_string())
            })
            .unwrap();
        assert!(retried);
    }

    #[test]
    fn test_key_reused_after_eviction_gets_fresh_id() {
        let mut cache = cache();
        let first = cache.get_or_create((3, 3), |_| Ok::<_, ()>("a".to_string())).unwrap();
        cache.release(first);
        let second = cache.get_or_create((3, 3), |_| Ok::<_, ()>("b".to_string())).unwrap();
        assert_ne!(first, second);
        assert!(!cache.contains(first));
        assert_eq!(cache.get(second), "b");
    }

    #[test]
    #[should_panic(expected = "released an entry that is not live")]
    fn test_double_release_panics() {
        let mut cache = cache();
        let id = cache.get_or_create((0, 0), |_| Ok::<_, ()>(String::new())).unwrap();
        cache.release(id);
        cache.release(id);
    }

    #[test]
    #[should_panic(expected = "unknown identity")]
    fn test_get_unknown_panics() {
        let cache = cache();
        let _ = cache.get(TestId::default());
    }
}
