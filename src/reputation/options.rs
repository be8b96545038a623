use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationOptions {
    pub factor_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    /// RDAP base, the domain name is appended.
    pub rdap_url: String,
    /// Domain-based DNSBL zones.
    pub blacklist_zones: Vec<String>,
}

impl Default for ReputationOptions {
    fn default() -> Self {
        Self {
            factor_timeout_ms: 5_000,
            cache_ttl_secs: 3_600,
            rdap_url: "https://rdap.org/domain/".to_string(),
            blacklist_zones: vec![
                "dbl.spamhaus.org".to_string(),
                "multi.surbl.org".to_string(),
                "black.uribl.com".to_string(),
            ],
        }
    }
}

impl ReputationOptions {
    pub fn factor_timeout(&self) -> Duration {
        Duration::from_millis(self.factor_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
