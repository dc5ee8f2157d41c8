//! Key-value storage backends.
//!
//! # Backends
//!
//! - [`MemoryBackend`]: in-process map with per-entry expiry
//! - `RedisBackend`: Redis via a connection manager (requires the `redis` feature)

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{CacheError, Result};

/// Abstract key-value store with optional per-key expiry.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// With a `ttl` the entry expires after that long; `None` keeps it until deleted.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Get the value under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete `key`; returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Map size at which `put` first sweeps out expired entries.
const MIN_SWEEP_LEN: usize = 1024;

struct Store {
    map: HashMap<String, Entry>,
    // Sweep once the map grows to this size.
    sweep_at: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: MIN_SWEEP_LEN,
        }
    }
}

impl Store {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        self.sweep_at = (self.map.len() * 2).max(MIN_SWEEP_LEN);
        before - self.map.len()
    }
}

/// In-process backend, for tests and single-instance services.
///
/// Expired entries are dropped when read, and swept in bulk whenever a write
/// finds the map has doubled in size since the last sweep.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<Store>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|store| store.map.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Whether there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.lock()?.purge_expired(Instant::now());
        if removed > 0 {
            log::debug!("Purged {removed} expired memory cache entries");
        }
        Ok(removed)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Store>> {
        self.entries
            .lock()
            .map_err(|e| CacheError::backend(format!("memory backend lock poisoned: {e}")))
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let now = Instant::now();
        // A TTL too large to represent never expires.
        let expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        let mut store = self.lock()?;
        if store.map.len() >= store.sweep_at {
            store.purge_expired(now);
        }
        store.map.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut store = self.lock()?;
        match store.map.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                store.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .map
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
