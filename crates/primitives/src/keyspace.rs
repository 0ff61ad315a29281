//! Keyspace: root handle for a shared primitive store
//!
//! Owns the store and one re-entrant lock per namespace name. Every
//! `NamespacedStore` handed out for the same name (and every list or map
//! derived from it) shares that lock, so multi-write sequences such as
//! `IndexedList::add` do not interleave across threads.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;

use stratakv_core::KvStore;

use crate::namespace::{NamespaceLock, NamespacedStore};

/// Shared store plus per-namespace lock registry
///
/// # Example
///
/// ```ignore
/// let keyspace = Keyspace::from_store(MemoryStore::new());
/// let jobs = keyspace.namespace("jobs");
/// let mut queue = jobs.list("pending")?;
/// queue.add("job-1");
/// ```
pub struct Keyspace {
    store: Arc<dyn KvStore>,
    locks: DashMap<String, NamespaceLock>,
}

impl Keyspace {
    /// Wrap an already shared store
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Keyspace {
            store,
            locks: DashMap::new(),
        }
    }

    /// Take ownership of a store
    pub fn from_store<S: KvStore + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    /// The underlying primitive store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Namespaced view sharing the lock of every other view with this name
    pub fn namespace(&self, name: &str) -> NamespacedStore {
        // Entry API: the lock is created at most once per name
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .value()
            .clone();
        NamespacedStore::with_lock(Arc::clone(&self.store), name.to_string(), lock)
    }

    /// Number of namespaces handed out so far
    pub fn namespace_count(&self) -> usize {
        self.locks.len()
    }
}

impl std::fmt::Debug for Keyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyspace")
            .field("namespaces", &self.locks.len())
            .finish_non_exhaustive()
    }
}
