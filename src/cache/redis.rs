use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use tracing::info;

use super::{CacheError, CacheResult, CacheStore};

// INCRBY + EXPIRE on first creation, in one round trip.
const INCREMENT_SCRIPT: &str = r"
local value = redis.call('INCRBY', KEYS[1], ARGV[1])
if value == tonumber(ARGV[1]) then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return value
";

/// Redis-backed [`CacheStore`] sharing state across processes.
///
/// Keys are namespaced with `key_prefix` so one Redis can serve several
/// deployments.
pub struct RedisCache {
    conn: ConnectionManager,
    key_prefix: String,
    increment: Script,
}

impl RedisCache {
    /// Connects and validates the connection with a PING.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> CacheResult<Self> {
        info!(url = redis_url, "connecting to Redis");

        let client = Client::open(redis_url)
            .map_err(|err| CacheError::Connection(format!("invalid Redis URL: {err}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::Connection(format!("failed to connect: {err}")))?;

        let mut probe = conn.clone();
        probe
            .ping::<()>()
            .await
            .map_err(|err| CacheError::Connection(format!("PING failed: {err}")))?;

        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
            increment: Script::new(INCREMENT_SCRIPT),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(self.key(key))
            .await
            .map_err(|err| CacheError::operation(key, err))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(key), value, seconds(ttl))
            .await
            .map_err(|err| CacheError::operation(key, err))
    }

    async fn increment(&self, key: &str, amount: u64, ttl: Duration) -> CacheResult<u64> {
        let mut conn = self.conn.clone();
        let mut invocation = self.increment.key(self.key(key));
        invocation.arg(amount).arg(seconds(ttl));
        let count: u64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|err| CacheError::operation(key, err))?;
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let millis: i64 = conn
            .pttl(self.key(key))
            .await
            .map_err(|err| CacheError::operation(key, err))?;
        // -2: absent, -1: no expiry
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }
}
