use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsOptions {
    /// Per-query deadline.
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            cache_ttl_secs: 3_600,
        }
    }
}

impl DnsOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
