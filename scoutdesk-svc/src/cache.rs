//! Short-lived read cache
//!
//! Service reads may be memoised for `ttl`; every mutating call invalidates
//! the whole family it touched before returning. Values are stored as JSON
//! so one cache serves every entity type.

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use scoutdesk_common::config::DEFAULT_CACHE_CAPACITY;

/// Entity families; invalidation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Reports,
    Intelligence,
    Offers,
    Shortlists,
    NameMap,
    Options,
}

type Key = (Family, String);

/// TTL-checked LRU; at most `capacity` entries are held, expired ones are
/// dropped on read and swept on write
pub struct ReadCache {
    ttl: Duration,
    entries: Mutex<LruCache<Key, (Instant, Value)>>,
}

impl ReadCache {
    /// A zero `ttl` disables caching
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CACHE_CAPACITY)
    }

    /// A zero `capacity` is raised to one entry
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, family: Family, key: &str) -> Option<T> {
        if self.ttl.is_zero() {
            return None;
        }
        let key = (family, key.to_string());
        let mut entries = self.entries.lock().await;
        let (stored_at, value) = entries.get(&key)?;
        if stored_at.elapsed() > self.ttl {
            entries.pop(&key);
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub async fn put<T: Serialize>(&self, family: Family, key: &str, value: &T) {
        if self.ttl.is_zero() {
            return;
        }
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        let mut entries = self.entries.lock().await;
        self.sweep_expired(&mut entries);
        entries.put((family, key.to_string()), (Instant::now(), value));
    }

    /// Drop every entry of a family
    pub async fn invalidate(&self, family: Family) {
        let mut entries = self.entries.lock().await;
        let stale: Vec<Key> = entries
            .iter()
            .filter(|((f, _), _)| *f == family)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        debug!(?family, dropped = stale.len(), "Cache family invalidated");
    }

    /// Entries currently held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Pop every expired entry
    ///
    /// `get` promotes without restamping, so LRU order is not age order.
    fn sweep_expired(&self, entries: &mut LruCache<Key, (Instant, Value)>) {
        let expired: Vec<Key> = entries
            .iter()
            .filter(|(_, (stored_at, _))| stored_at.elapsed() > self.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_and_invalidate() {
        let cache = ReadCache::new(Duration::from_secs(60));
        cache.put(Family::Offers, "42", &vec![1, 2, 3]).await;
        cache.put(Family::Reports, "42", &"kept".to_string()).await;

        assert_eq!(cache.get::<Vec<i32>>(Family::Offers, "42").await, Some(vec![1, 2, 3]));

        cache.invalidate(Family::Offers).await;
        assert_eq!(cache.get::<Vec<i32>>(Family::Offers, "42").await, None);
        assert_eq!(
            cache.get::<String>(Family::Reports, "42").await.as_deref(),
            Some("kept")
        );
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = ReadCache::new(Duration::ZERO);
        cache.put(Family::Options, "all", &1).await;
        assert_eq!(cache.get::<i32>(Family::Options, "all").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = ReadCache::new(Duration::from_millis(5));
        cache.put(Family::Intelligence, "k", &1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get::<i32>(Family::Intelligence, "k").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_released_on_put() {
        let cache = ReadCache::with_capacity(Duration::from_millis(1), 20_000);
        for i in 0..10_000 {
            cache.put(Family::Reports, &i.to_string(), &i).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.put(Family::Reports, "fresh", &0).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_bounds_entries() {
        let cache = ReadCache::with_capacity(Duration::from_secs(60), 3);
        for key in ["a", "b", "c"] {
            cache.put(Family::Offers, key, &key).await;
        }
        // Touch "a" so "b" is the least recently used
        assert!(cache.get::<String>(Family::Offers, "a").await.is_some());
        cache.put(Family::Offers, "d", &"d").await;

        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.get::<String>(Family::Offers, "b").await, None);
        assert_eq!(cache.get::<String>(Family::Offers, "a").await.as_deref(), Some("a"));
    }
}
