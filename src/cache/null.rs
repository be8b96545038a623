use std::time::Duration;

use async_trait::async_trait;

use super::{CacheResult, CacheStore};

/// No-op cache for runs with caching disabled.
///
/// Counters never accumulate, so a rate gate built on it admits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

#[async_trait]
impl CacheStore for NullCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn increment(&self, _key: &str, amount: u64, _ttl: Duration) -> CacheResult<u64> {
        Ok(amount)
    }

    async fn ttl(&self, _key: &str) -> CacheResult<Option<Duration>> {
        Ok(None)
    }
}
