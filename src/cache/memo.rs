use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{CacheStore, get_json, set_json};

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Fail-open, single-flight memoisation over a [`CacheStore`].
///
/// Backend errors are logged and treated as misses. Concurrent callers
/// asking for the same key inside this process wait for the first one
/// instead of computing the value again.
pub struct Memoizer {
    store: Arc<dyn CacheStore>,
    inflight: Mutex<HashMap<String, Gate>>,
}

impl Memoizer {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.store)
    }

    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match get_json(self.store.as_ref(), key).await {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn remember<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(err) = set_json(self.store.as_ref(), key, value, ttl).await {
            warn!(key, error = %err, "cache write failed");
        }
    }

    /// Returns the cached value for `key` or computes and stores it.
    ///
    /// Only `Ok` values are cached.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }

        let gate = self.gate(key);
        let result = {
            let _held = gate.lock().await;
            match self.lookup(key).await {
                Some(hit) => Ok(hit),
                None => {
                    let computed = compute().await;
                    if let Ok(value) = &computed {
                        self.remember(key, value, ttl).await;
                    }
                    computed
                }
            }
        };
        self.release(key, gate);
        result
    }

    fn gate(&self, key: &str) -> Gate {
        let mut inflight = self.inflight.lock();
        Arc::clone(inflight.entry(key.to_string()).or_default())
    }

    fn release(&self, key: &str, gate: Gate) {
        let mut inflight = self.inflight.lock();
        // one reference in the map, one held here
        if Arc::strong_count(&gate) <= 2 {
            inflight.remove(key);
        }
    }
}
