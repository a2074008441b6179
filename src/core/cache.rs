use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Bounded key → value cache with a per-entry TTL. Expired entries are
/// dropped on read; the stalest entry is evicted when an insert would
/// exceed capacity, so lookup results never accumulate for the lifetime
/// of the process.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    capacity: usize,
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fresh_entries() {
        let cache = TtlCache::new(4, Duration::from_secs(60));
        cache.insert("k", 1u32).await;
        assert_eq!(cache.get(&"k").await, Some(1));
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = TtlCache::new(4, Duration::from_millis(10));
        cache.insert("k", 1u32).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(&"k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn capacity_is_bounded() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1u32).await;
        cache.insert("b", 2u32).await;
        cache.insert("c", 3u32).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&"c").await, Some(3));
    }

    #[tokio::test]
    async fn reinserting_existing_key_does_not_evict() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1u32).await;
        cache.insert("b", 2u32).await;
        cache.insert("a", 9u32).await;
        assert_eq!(cache.get(&"a").await, Some(9));
        assert_eq!(cache.get(&"b").await, Some(2));
    }
}
