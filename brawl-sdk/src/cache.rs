use crate::endpoint::Endpoint;
use cached::{Cached, SizedCache};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    stored_at: Instant,
    body: Value,
}

/// Successful response bodies keyed by endpoint.
///
/// Entries expire `ttl` after they were stored, whether or not they are read
/// in the meantime. When full, the least recently used entry makes room.
pub struct ResponseCache {
    entries: Mutex<SizedCache<Endpoint, Entry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// `None` when `capacity` is zero, which disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            entries: Mutex::new(SizedCache::with_size(capacity)),
            ttl,
        })
    }

    pub fn lookup(&self, endpoint: &Endpoint) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.cache_get(endpoint) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.body.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.cache_remove(endpoint);
        }
        None
    }

    pub fn store(&self, endpoint: &Endpoint, body: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.cache_set(
            endpoint.clone(),
            Entry {
                stored_at: Instant::now(),
                body,
            },
        );
    }

    /// Entries held, expired ones included until they are next looked up.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_clear();
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Resolver;
    use crate::tag::Tag;
    use serde_json::json;

    fn endpoint(tag: &str) -> Endpoint {
        Resolver::new("https://api.brawlstars.com/v1", "https://c", true)
            .player(&Tag::parse(tag, true).unwrap())
    }

    #[test]
    fn zero_capacity_disables() {
        assert!(ResponseCache::new(0, Duration::from_secs(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn store_then_lookup() {
        let cache = ResponseCache::new(10, Duration::from_secs(180)).unwrap();
        let e = endpoint("GGJVJLU2");
        assert_eq!(cache.lookup(&e), None);
        cache.store(&e, json!({"tag": "#GGJVJLU2"}));
        assert_eq!(cache.lookup(&e), Some(json!({"tag": "#GGJVJLU2"})));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(10, Duration::from_secs(180)).unwrap();
        let e = endpoint("GGJVJLU2");
        cache.store(&e, json!(1));

        tokio::time::advance(Duration::from_secs(179)).await;
        assert_eq!(cache.lookup(&e), Some(json!(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.lookup(&e), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reading_does_not_extend_ttl() {
        let cache = ResponseCache::new(10, Duration::from_secs(10)).unwrap();
        let e = endpoint("QCGV8PG");
        cache.store(&e, json!("club"));
        for _ in 0..9 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(cache.lookup(&e).is_some());
        }
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.lookup(&e).is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ResponseCache::new(2, Duration::from_secs(60)).unwrap();
        let (a, b, c) = (endpoint("PPP"), endpoint("YYY"), endpoint("LLL"));
        cache.store(&a, json!("a"));
        cache.store(&b, json!("b"));
        // touch a so b is the oldest
        assert!(cache.lookup(&a).is_some());
        cache.store(&c, json!("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&a).is_some());
        assert!(cache.lookup(&b).is_none());
        assert!(cache.lookup(&c).is_some());
    }

    #[test]
    fn clear_empties() {
        let cache = ResponseCache::new(2, Duration::from_secs(60)).unwrap();
        cache.store(&endpoint("PPP"), json!(null));
        cache.clear();
        assert!(cache.is_empty());
    }
}
