//! In-memory TTL cache shared by the weather client.
//!
//! Entries expire lazily: an expired entry is purged the next time it is
//! read. There is no background sweep.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => at > now,
            None => true,
        }
    }
}

/// Key/value store with per-entry expiry.
///
/// One mutex guards the whole map; it is held only for the map operation
/// itself, never across a network call.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Return the live value for `key`, purging it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            None => return None,
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        entries.remove(key);
        tracing::trace!(key, "Cache entry expired");
        None
    }

    /// Store `value` under `key`, replacing any existing entry.
    ///
    /// Negative TTLs are treated as zero, which makes the entry expire immediately.
    pub fn set(&self, key: impl Into<String>, value: V, ttl_seconds: i64) {
        let ttl = Duration::from_secs(ttl_seconds.max(0).unsigned_abs());
        let expires_at = self.clock.now().checked_add(ttl);
        self.entries
            .lock()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock() -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_set_then_get() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", "v".to_string(), 60);
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_missing_key() {
        let (cache, _clock) = cache_with_clock();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_expiry_and_no_resurrection() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), 10);

        clock.advance(Duration::from_secs(9));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0, "expired entry should be purged on read");

        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_expires_exactly_at_deadline() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), 5);
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_zero_and_negative_ttl_expire_immediately() {
        let (cache, _clock) = cache_with_clock();
        cache.set("zero", "v".to_string(), 0);
        cache.set("negative", "v".to_string(), -30);
        assert_eq!(cache.get("zero"), None);
        assert_eq!(cache.get("negative"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), i64::MAX);
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        let system = TtlCache::<u8>::new();
        system.set("k", 1, i64::MAX);
        assert_eq!(system.get("k"), Some(1));
    }

    #[test]
    fn test_set_overwrites() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "old".to_string(), 1);
        cache.set("k", "new".to_string(), 100);
        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.get("k").as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unread_expired_entries_linger() {
        let (cache, clock) = cache_with_clock();
        cache.set("a", "1".to_string(), 1);
        cache.set("b", "2".to_string(), 1);
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.len(), 2);
        cache.get("a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(TtlCache::<usize>::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("{}:{}", t, i % 10);
                        cache.set(key.clone(), i, 60);
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 80);
    }
}
