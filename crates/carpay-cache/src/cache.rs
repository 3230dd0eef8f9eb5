use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Key/value cache where every entry expires strictly by TTL.
///
/// Expired entries are ignored on read and dropped lazily (on overwrite or
/// `purge_expired`). There is no size bound and no LRU. Concurrent misses
/// on the same key may each run the producer; the last write wins.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub async fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Cached value for `key`, or the producer's result (stored with `ttl`).
    ///
    /// Producer errors are returned as-is and not cached.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = producer().await?;
        self.insert(key, value.clone(), ttl).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop every key matching `pattern`: `prefix*` matches by prefix,
    /// anything else must match exactly. Returns the number of keys dropped.
    pub async fn invalidate_matching(&self, pattern: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        match pattern.strip_suffix('*') {
            Some(prefix) => entries.retain(|k, _| !k.starts_with(prefix)),
            None => {
                entries.remove(pattern);
            }
        }
        before - entries.len()
    }

    /// Drop expired entries. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// Stored entries, including expired ones not purged yet.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
