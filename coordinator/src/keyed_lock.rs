//! Lazily created per-key mutual exclusion.
//!
//! Each key gets its own mutex the first time it is referenced. Registration
//! is an atomic get-or-insert on a sharded concurrent map, so two callers
//! racing on a fresh key always end up with the same mutex, and callers on
//! different keys never wait on each other beyond a brief shard lock during
//! lookup. Entries are never removed: the registry grows with the number of
//! distinct keys seen, which is bounded by venue capacity for seats.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

/// Registry of per-key mutexes.
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    /// Lock space name, used in log output.
    name: &'static str,
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an empty lock space.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            locks: DashMap::new(),
        }
    }

    /// Get the mutex for a key, creating it on first reference.
    pub fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        // Read path first so hot keys only take the shard's read lock.
        let existing = self.locks.get(key).map(|lock| Arc::clone(lock.value()));
        if let Some(lock) = existing {
            return lock;
        }

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(lock_space = self.name, key = ?key, "Key lock created");
                Arc::new(Mutex::new(()))
            });
        Arc::clone(lock.value())
    }

    /// Run `critical` while holding the key's mutex.
    pub fn with_lock<R>(&self, key: &K, critical: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(key);
        let _guard = lock.lock();
        critical()
    }

    /// Number of keys that have a mutex.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no key has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
