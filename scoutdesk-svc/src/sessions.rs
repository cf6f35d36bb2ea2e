//! In-memory state that lapses when left idle
//!
//! Bearer sessions and legacy ingest runs live only in the process. Each
//! entry records when it was last used; a lookup refreshes that stamp, and
//! every access evicts entries idle longer than the configured limit.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Slot<V> {
    last_seen: Instant,
    value: V,
}

pub struct IdleMap<K, V> {
    idle: Duration,
    label: &'static str,
    entries: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> IdleMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// `label` names the map in eviction logs
    pub fn new(label: &'static str, idle: Duration) -> Self {
        Self {
            idle,
            label,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        self.evict_idle(&mut entries);
        entries.insert(
            key,
            Slot {
                last_seen: Instant::now(),
                value,
            },
        );
    }

    /// Clone the value out and mark it used
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        self.evict_idle(&mut entries);
        let slot = entries.get_mut(key)?;
        slot.last_seen = Instant::now();
        Some(slot.value.clone())
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().await.remove(key).map(|slot| slot.value)
    }

    /// Live entries, after evicting idle ones
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        self.evict_idle(&mut entries);
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict_idle(&self, entries: &mut HashMap<K, Slot<V>>) {
        let before = entries.len();
        entries.retain(|_, slot| slot.last_seen.elapsed() <= self.idle);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(map = self.label, evicted, "Idle entries evicted");
        }
    }
}
