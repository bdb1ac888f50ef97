//! The two keyed candidate caches, generalized over key and value so the
//! same type serves both the `iface` cache and the `(command_name, iface)`
//! cache -- the same generalization the reference solver applies between
//! its `ClauseDb` and `OccurrenceMap` (one storage shape, two index
//! spaces).

use ahash::AHashMap;
use std::cell::RefCell;
use std::hash::Hash;

/// A lazily-populated, keyed table. Mutable during problem construction;
/// call [`Cache::snapshot`] before handing results to the solver or the
/// decider, both of which must see a frozen view.
#[derive(Debug)]
pub struct Cache<K, V> {
    entries: RefCell<AHashMap<K, V>>,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(AHashMap::new()),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, computing it with `make` if
    /// absent.
    ///
    /// `make` returns `(value, continuation)`: `value` is stored *before*
    /// `continuation` runs, so that if `continuation` recurses back into
    /// `lookup` for the same `key` (a dependency cycle), it observes the
    /// half-built entry instead of calling `make` again. `make` itself must
    /// never call `lookup` directly -- only the continuation it returns may
    /// recurse. Violating this invariant is a programmer error, not a
    /// reportable one; see [`crate::error::Error::ReentrantCacheLookup`].
    pub fn lookup<F, C>(&self, key: K, make: F) -> V
    where
        F: FnOnce(&K) -> (V, C),
        C: FnOnce(),
    {
        if let Some(existing) = self.entries.borrow().get(&key) {
            return existing.clone();
        }
        let (value, continuation) = make(&key);
        self.entries.borrow_mut().insert(key.clone(), value.clone());
        continuation();
        value
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).cloned()
    }

    /// Freezes the current contents into an immutable snapshot.
    pub fn snapshot(&self) -> CacheSnapshot<K, V> {
        CacheSnapshot {
            entries: self.entries.borrow().clone(),
        }
    }
}

/// An immutable view of a [`Cache`], taken after problem construction.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<K, V> {
    entries: AHashMap<K, V>,
}

impl<K, V> CacheSnapshot<K, V>
where
    K: Eq + Hash + Clone + Ord,
    V: Clone,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn get_exn(&self, key: &K) -> V {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| panic!("cache snapshot missing expected key"))
    }

    /// Sorted `(key, value)` pairs, lexicographic by key. Used wherever
    /// output order must be deterministic (result assembly, §4.5/§4.6).
    pub fn bindings(&self) -> Vec<(K, V)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }
}
