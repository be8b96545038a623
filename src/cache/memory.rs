use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{CacheError, CacheResult, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY: u64 = 256;

/// In-process cache. Expired entries are dropped when read and swept
/// periodically on write, so keys that are never read again do not pile up.
///
/// Uses tokio's clock so paused-time tests can move past a TTL.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries. Expired ones are dropped on the way.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_if_due(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY != SWEEP_EVERY - 1 {
            return;
        }
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        tracing::trace!(swept = before - entries.len(), "swept expired cache entries");
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now + ttl,
        };
        let mut entries = self.entries.lock();
        self.sweep_if_due(&mut entries, now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let current = match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry),
            _ => None,
        };

        let (count, expires_at) = match current {
            Some(entry) => {
                let count = entry
                    .value
                    .parse::<u64>()
                    .map_err(|err| CacheError::operation(key, format!("not a counter: {err}")))?;
                (count.saturating_add(amount), entry.expires_at)
            }
            None => (amount, now + ttl),
        };

        self.sweep_if_due(&mut entries, now);
        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now))
    }
}
