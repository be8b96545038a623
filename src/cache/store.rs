use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use super::{CacheError, CacheResult};

/// Shared key/value capability used for memoisation and rate limiting.
///
/// Values are opaque strings (JSON by convention). Every write carries a TTL;
/// entries are only ever invalidated by expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Atomically adds `amount` to the counter at `key` and returns the new
    /// value. The expiry is set when the counter is created and left alone
    /// on later increments, which gives fixed windows.
    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> CacheResult<u64>;

    /// Remaining lifetime of `key`, `None` when absent.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;
}

pub async fn get_json<T>(store: &dyn CacheStore, key: &str) -> CacheResult<Option<T>>
where
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| CacheError::codec(key, err)),
        None => Ok(None),
    }
}

pub async fn set_json<T>(store: &dyn CacheStore, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|err| CacheError::codec(key, err))?;
    store.set(key, &raw, ttl).await
}
