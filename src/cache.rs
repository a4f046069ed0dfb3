/// Source of "now" for expiry checks.
pub trait Clock {
    fn now(&self) -> std::time::Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<std::time::Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::rc::Rc::new(std::cell::Cell::new(std::time::Instant::now())),
        }
    }

    /// Moves this clock and every clone of it forward.
    pub fn advance(&self, by: std::time::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> std::time::Instant {
        self.now.get()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: std::time::Instant,
    ttl: std::time::Duration,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: std::time::Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

/// In-memory map whose entries expire a fixed time after insertion.
///
/// There is no size bound and no LRU ordering. Expired entries are dropped
/// when they are looked up or on [`TtlCache::purge_expired`].
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    entries: std::collections::HashMap<K, CacheEntry<V>>,
    clock: C,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + std::hash::Hash,
{
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K, V> Default for TtlCache<K, V, SystemClock>
where
    K: Eq + std::hash::Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + std::hash::Hash,
    C: Clock,
{
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: std::collections::HashMap::new(),
            clock,
        }
    }

    /// Stores `value` under `key`, replacing any previous entry and
    /// restarting its lifetime.
    pub fn set(&mut self, key: K, value: V, ttl: std::time::Duration) {
        let entry = CacheEntry {
            value,
            created_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Returns the value for `key` if it has not expired. An expired entry
    /// is removed.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.evict_if_expired(key) {
            return None;
        }
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Same expiry check as [`TtlCache::get`] without handing out the value.
    pub fn has(&mut self, key: &K) -> bool {
        self.evict_if_expired(key)
    }

    /// Returns the live value for `key`, computing and storing it first when
    /// absent or expired.
    pub fn get_or_insert_with<F>(&mut self, key: K, ttl: std::time::Duration, f: F) -> &V
    where
        F: FnOnce() -> V,
    {
        let now = self.clock.now();
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                if !occupied.get().is_live(now) {
                    occupied.insert(CacheEntry {
                        value: f(),
                        created_at: now,
                        ttl,
                    });
                }
                &occupied.into_mut().value
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let entry = vacant.insert(CacheEntry {
                    value: f(),
                    created_at: now,
                    ttl,
                });
                &entry.value
            }
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before - self.entries.len()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns whether a live entry for `key` remains after the check.
    fn evict_if_expired(&mut self, key: &K) -> bool {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => true,
            Some(_) => {
                self.entries.remove(key);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: std::time::Duration = std::time::Duration::from_secs(60);

    fn manual_cache() -> (TtlCache<String, Vec<u32>, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (TtlCache::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_get_after_set_returns_value() {
        let (mut cache, _clock) = manual_cache();
        cache.set("1Y".to_string(), vec![1, 2, 3], TTL);
        assert_eq!(cache.get(&"1Y".to_string()), Some(&vec![1, 2, 3]));
        assert!(cache.has(&"1Y".to_string()));
        assert_eq!(cache.get(&"1M".to_string()), None);
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let (mut cache, clock) = manual_cache();
        let key = "1W".to_string();
        cache.set(key.clone(), vec![7], TTL);

        clock.advance(std::time::Duration::from_secs(59));
        assert!(cache.has(&key));

        clock.advance(std::time::Duration::from_secs(1));
        assert_eq!(cache.get(&key), None);
        // Expired entries are evicted on read.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_is_never_live() {
        let (mut cache, _clock) = manual_cache();
        cache.set("k".to_string(), vec![], std::time::Duration::ZERO);
        assert!(!cache.has(&"k".to_string()));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_overwrites_and_restarts_lifetime() {
        let (mut cache, clock) = manual_cache();
        let key = "3M".to_string();
        cache.set(key.clone(), vec![1], TTL);
        clock.advance(std::time::Duration::from_secs(50));
        cache.set(key.clone(), vec![2], TTL);
        clock.advance(std::time::Duration::from_secs(50));
        assert_eq!(cache.get(&key), Some(&vec![2]));
    }

    #[test]
    fn test_get_or_insert_with_recomputes_only_when_expired() {
        let (mut cache, clock) = manual_cache();
        let mut calls = 0;
        let key = "ALL".to_string();

        cache.get_or_insert_with(key.clone(), TTL, || {
            calls += 1;
            vec![calls]
        });
        let value = cache.get_or_insert_with(key.clone(), TTL, || vec![99]).clone();
        assert_eq!(value, vec![1]);

        clock.advance(TTL);
        let value = cache.get_or_insert_with(key.clone(), TTL, || vec![2]).clone();
        assert_eq!(value, vec![2]);
    }

    #[test]
    fn test_purge_expired() {
        let (mut cache, clock) = manual_cache();
        cache.set("short".to_string(), vec![], std::time::Duration::from_secs(1));
        cache.set("long".to_string(), vec![], TTL);
        clock.advance(std::time::Duration::from_secs(5));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
