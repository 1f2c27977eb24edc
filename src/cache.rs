//! Bounded, time-limited cache keyed by normalized query strings.
//!
//! Entries expire `ttl` after they were written and the cache never holds
//! more than `max_entries` keys. When a new key would overflow the cache the
//! earliest-inserted key is evicted, regardless of how recently it was read.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
struct Entries<V> {
    map: HashMap<String, CacheEntry<V>>,
    // Insertion order, oldest first. Always holds exactly the keys of `map`.
    order: VecDeque<String>,
}

pub struct TtlCache<V> {
    entries: Mutex<Entries<V>>,
    fills: Mutex<HashMap<String, Gate>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_entries: usize,
}

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_ENTRIES: usize = 100;

fn normalize(key: &str) -> String {
    key.to_lowercase()
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            fills: Mutex::new(HashMap::new()),
            clock,
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the value for `key` if it was written less than `ttl` ago.
    pub fn get(&self, key: &str) -> Option<V> {
        let key = normalize(key);
        let now = self.clock.now();
        let entries = self.entries.lock();
        entries
            .map
            .get(&key)
            .filter(|entry| now.saturating_duration_since(entry.inserted_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V) {
        let key = normalize(key);
        let inserted_at = self.clock.now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.map.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = inserted_at;
            return;
        }

        if entries.map.len() >= self.max_entries {
            if let Some(oldest) = entries.order.pop_front() {
                entries.map.remove(&oldest);
                tracing::debug!("Evicted oldest cache entry {:?}", oldest);
            }
        }

        entries.order.push_back(key.clone());
        entries.map.insert(key, CacheEntry { value, inserted_at });
    }

    /// Reports whether `key` is stored at all, expired or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().map.contains_key(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.map.clear();
        entries.order.clear();
    }

    /// Returns the fresh cached value for `key`, or runs `fill` and caches its
    /// successful result.
    ///
    /// Concurrent callers for the same key wait for the first fill instead of
    /// issuing their own. Errors are returned to the caller that ran the fill
    /// and are never stored.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!("Cache hit for {:?}", key);
            return Ok(value);
        }

        let slot = FillSlot::claim(&self.fills, normalize(key));
        let _permit = slot.lock().await;
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        tracing::debug!("Cache miss for {:?}", key);
        let filled = fill().await;
        if let Ok(value) = &filled {
            self.set(key, value.clone());
        }
        filled
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// A caller's claim on the fill gate for one key.
///
/// Dropping the slot, on return or when the caller's future is cancelled,
/// removes the gate from the map once no other caller holds it.
struct FillSlot<'a> {
    fills: &'a Mutex<HashMap<String, Gate>>,
    key: String,
    gate: Option<Gate>,
}

impl<'a> FillSlot<'a> {
    fn claim(fills: &'a Mutex<HashMap<String, Gate>>, key: String) -> Self {
        let gate = fills.lock().entry(key.clone()).or_default().clone();
        Self {
            fills,
            key,
            gate: Some(gate),
        }
    }

    async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }
}

impl Drop for FillSlot<'_> {
    fn drop(&mut self) {
        // Release our reference before counting, so the last caller out
        // always sees only the map's own.
        drop(self.gate.take());
        let mut fills = self.fills.lock();
        if fills
            .get(&self.key)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            fills.remove(&self.key);
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}
