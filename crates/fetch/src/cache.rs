//! Expiring cache slots with per-key fill locks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

/// Map of expiring values plus one async lock per key.
///
/// Reads of fresh values never wait on anything but a short synchronous read
/// lock. Fills for the same key serialize on that key's lock; fills for
/// different keys proceed independently. Entries are only ever replaced by a
/// successful fill, never evicted.
pub(crate) struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    fill_locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}
impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            fill_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The cached value for `key`, if present and unexpired.
    pub(crate) fn fresh(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(key).filter(|entry| entry.expires_at > Instant::now()).map(|entry| entry.value.clone())
    }

    /// The stored value for `key`, expired or not.
    #[cfg(test)]
    pub(crate) fn peek(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// The fill lock for `key`, created on first use.
    pub(crate) fn fill_lock(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.fill_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    /// Stores a freshly fetched value with a new expiry.
    pub(crate) fn store(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let entry = CacheEntry {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().unwrap_or_else(|p| p.into_inner()).insert(key, entry);
        value
    }
}
