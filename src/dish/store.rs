//! Size- and age-bounded LRU store of representations.
//!
//! Misses go through [`CacheStore::get_or_populate`]: the first caller for a key
//! starts a flight, later callers for the same key join it, and every joiner
//! gets the same record (or the same error). The store lock is held only for
//! map bookkeeping, never across population, so keys never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::record::Representation;
use crate::error::DishError;

pub const DEFAULT_CAPACITY_BYTES: u64 = 256_000_000;
pub const DEFAULT_MAX_AGE_MILLIS: u64 = 3_600_000;

type FlightResult = Result<Arc<Representation>, DishError>;
type Flight = Shared<BoxFuture<'static, FlightResult>>;

/// Store limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Upper bound on the summed weight of all entries
    pub capacity_bytes: u64,
    /// Entries older than this are treated as absent
    pub max_age_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            max_age_ms: DEFAULT_MAX_AGE_MILLIS,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), DishError> {
        if self.capacity_bytes == 0 {
            return Err(DishError::config("cache capacity_bytes must be positive"));
        }
        if self.max_age_ms == 0 {
            return Err(DishError::config("cache max_age_ms must be positive"));
        }
        Ok(())
    }

    pub const fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

/// Point-in-time view of the store, for the management API
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub total_weight: u64,
    pub in_flight: usize,
    pub capacity_bytes: u64,
    pub max_age_ms: u64,
    /// Most recently used first
    pub keys: Vec<String>,
}

struct Entry {
    record: Arc<Representation>,
    inserted: Instant,
    weight: u64,
}

struct PendingFlight {
    id: u64,
    flight: Flight,
}

struct State {
    entries: LruCache<String, Entry>,
    total_weight: u64,
    in_flight: HashMap<String, PendingFlight>,
    next_flight: u64,
}

impl State {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.total_weight -= entry.weight;
                true
            }
            None => false,
        }
    }

    fn evict_to(&mut self, capacity: u64) {
        while self.total_weight > capacity {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.total_weight -= entry.weight;
            tracing::debug!(key = %key, weight = entry.weight, "evicted least recently used entry");
        }
    }
}

/// Shared representation cache
pub struct CacheStore {
    config: StoreConfig,
    state: Mutex<State>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn weight_of(record: &Representation) -> u64 {
    u64::try_from(record.weight()).unwrap_or(u64::MAX)
}

impl CacheStore {
    /// Create a store; zero capacity or zero max age is rejected
    pub fn new(config: StoreConfig) -> Result<Self, DishError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(State {
                entries: LruCache::unbounded(),
                total_weight: 0,
                in_flight: HashMap::new(),
                next_flight: 0,
            }),
        })
    }

    /// Store with no practical bounds, for dishes that own their single entry
    pub(crate) fn unbounded() -> Self {
        Self {
            config: StoreConfig {
                capacity_bytes: u64::MAX,
                max_age_ms: u64::MAX,
            },
            state: Mutex::new(State {
                entries: LruCache::unbounded(),
                total_weight: 0,
                in_flight: HashMap::new(),
                next_flight: 0,
            }),
        }
    }

    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.inserted.elapsed() > self.config.max_age()
    }

    fn lookup(&self, state: &mut State, key: &str) -> Option<Arc<Representation>> {
        let expired = self.is_expired(state.entries.peek(key)?);
        if expired {
            state.remove(key);
            tracing::debug!(key, "entry expired");
            return None;
        }
        state.entries.get(key).map(|entry| Arc::clone(&entry.record))
    }

    /// Fetch a live record and mark it most recently used
    ///
    /// Absent when unknown, expired, or still being populated.
    pub fn get(&self, key: &str) -> Option<Arc<Representation>> {
        let mut state = self.state.lock();
        self.lookup(&mut state, key)
    }

    /// Insert or replace, resetting recency and age, then evict down to capacity
    ///
    /// A record heavier than the whole capacity is not stored.
    pub fn set(&self, key: impl Into<String>, record: Arc<Representation>) {
        let mut state = self.state.lock();
        self.insert_locked(&mut state, key.into(), record);
    }

    fn insert_locked(&self, state: &mut State, key: String, record: Arc<Representation>) {
        let weight = weight_of(&record);
        if weight > self.config.capacity_bytes {
            // Could never fit; drop any older version and leave the rest alone
            state.remove(&key);
            tracing::debug!(
                key = %key,
                weight,
                capacity = self.config.capacity_bytes,
                "entry exceeds capacity, not cached"
            );
            return;
        }
        let entry = Entry {
            record,
            inserted: Instant::now(),
            weight,
        };
        if let Some(previous) = state.entries.put(key, entry) {
            state.total_weight -= previous.weight;
        }
        state.total_weight = state.total_weight.saturating_add(weight);
        state.evict_to(self.config.capacity_bytes);
    }

    /// Remove one key; also detaches any population in flight for it
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        state.in_flight.remove(key);
        let removed = state.remove(key);
        tracing::debug!(key, removed, "invalidated key");
        removed
    }

    /// Remove `prefix` and every key below `prefix/`
    ///
    /// Returns the number of cached entries removed.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let root = prefix.trim_end_matches('/');
        let nested = format!("{root}/");
        let matches = |key: &str| key == root || key == prefix || key.starts_with(&nested);

        let mut state = self.state.lock();
        state.in_flight.retain(|key, _| !matches(key.as_str()));
        let doomed: Vec<String> = state
            .entries
            .iter()
            .filter(|(key, _)| matches(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            state.remove(key);
        }
        tracing::debug!(prefix, removed = doomed.len(), "invalidated prefix");
        doomed.len()
    }

    /// Drop every entry and detach every flight
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.in_flight.clear();
        state.total_weight = 0;
        tracing::debug!("cache reset");
    }

    /// Actively drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_weight(&self) -> u64 {
        self.state.lock().total_weight
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock();
        StoreStats {
            entries: state.entries.len(),
            total_weight: state.total_weight,
            in_flight: state.in_flight.len(),
            capacity_bytes: self.config.capacity_bytes,
            max_age_ms: self.config.max_age_ms,
            keys: state.entries.iter().map(|(key, _)| key.clone()).collect(),
        }
    }

    /// Return the cached record for `key`, populating it at most once
    ///
    /// Concurrent misses for one key share a single run of `populate`, spawned
    /// on the runtime so it completes even when its callers are dropped. If it
    /// fails, every joined caller receives the error and nothing is cached, so
    /// the next request starts a fresh population.
    pub async fn get_or_populate<F, Fut>(self: &Arc<Self>, key: &str, populate: F) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Representation, DishError>> + Send + 'static,
    {
        let flight = {
            let mut state = self.state.lock();
            if let Some(record) = self.lookup(&mut state, key) {
                tracing::trace!(key, "cache hit");
                return Ok(record);
            }
            if let Some(pending) = state.in_flight.get(key) {
                tracing::trace!(key, "joined in-flight population");
                pending.flight.clone()
            } else {
                let id = state.next_flight;
                state.next_flight += 1;
                tracing::debug!(key, "cache miss, populating");

                // The population runs as its own task so it finishes and
                // publishes even if every caller goes away.
                let store = Arc::clone(self);
                let owned_key = key.to_string();
                let work = populate();
                let task = tokio::spawn(async move {
                    let outcome = work.await.map(Arc::new);
                    store.complete(&owned_key, id, &outcome);
                    outcome
                });

                let store = Arc::clone(self);
                let owned_key = key.to_string();
                let flight = task
                    .map(move |joined| {
                        joined.unwrap_or_else(|e| {
                            let outcome = Err(DishError::encoding(format!("population task failed: {e}")));
                            store.complete(&owned_key, id, &outcome);
                            outcome
                        })
                    })
                    .boxed()
                    .shared();

                state.in_flight.insert(
                    key.to_string(),
                    PendingFlight {
                        id,
                        flight: flight.clone(),
                    },
                );
                flight
            }
        };
        flight.await
    }

    /// Publish a finished flight, unless it was detached by an invalidation
    fn complete(&self, key: &str, id: u64, outcome: &FlightResult) {
        let mut state = self.state.lock();
        let current = state.in_flight.get(key).is_some_and(|p| p.id == id);
        if !current {
            tracing::debug!(key, "population finished after invalidation, not cached");
            return;
        }
        state.in_flight.remove(key);
        match outcome {
            Ok(record) => self.insert_locked(&mut state, key.to_string(), Arc::clone(record)),
            Err(e) => tracing::warn!(key, error = %e, "population failed"),
        }
    }
}
