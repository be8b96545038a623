use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Granularity, Tier};
use crate::cache::{CacheResult, CacheStore};

/// Counter state of one fixed window after a request was counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    pub key: String,
    pub tier: Tier,
    pub granularity: Granularity,
    pub count: u64,
    pub limit: u64,
    pub window_start: DateTime<Utc>,
}

impl RateWindow {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    pub fn exceeded(&self) -> bool {
        self.count > self.limit
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        self.window_start + self.granularity.length()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub windows: Vec<RateWindow>,
}

/// Tiered fixed-window limiter on top of [`CacheStore::increment`].
///
/// Every call counts against the second, minute and hour windows, denied
/// calls included. The request is denied as soon as one window is over its
/// limit.
pub struct RateGate {
    store: Arc<dyn CacheStore>,
    prefix: String,
}

impl RateGate {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_prefix(store, "ratelimit")
    }

    pub fn with_prefix(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub async fn check_and_consume(&self, key: &str, tier: Tier) -> CacheResult<RateDecision> {
        self.check_and_consume_at(key, tier, Utc::now()).await
    }

    pub async fn check_and_consume_at(
        &self,
        key: &str,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> CacheResult<RateDecision> {
        let limits = tier.limits();
        let mut windows = Vec::with_capacity(Granularity::ALL.len());

        for granularity in Granularity::ALL {
            let length = granularity.seconds() as i64;
            let index = now.timestamp().div_euclid(length);
            let window_start = Utc
                .timestamp_opt(index * length, 0)
                .single()
                .unwrap_or(now);
            let counter_key = format!("{}:{key}:{}:{index}", self.prefix, granularity.as_str());
            let count = self
                .store
                .increment(&counter_key, 1, granularity.length())
                .await?;

            windows.push(RateWindow {
                key: key.to_string(),
                tier,
                granularity,
                count,
                limit: limits.limit_for(granularity),
                window_start,
            });
        }

        let allowed = windows.iter().all(|window| !window.exceeded());
        let remaining = windows
            .iter()
            .map(RateWindow::remaining)
            .min()
            .unwrap_or(0);
        let reset_at = if allowed {
            windows
                .iter()
                .min_by_key(|window| window.remaining())
                .map(RateWindow::reset_at)
        } else {
            windows
                .iter()
                .filter(|window| window.exceeded())
                .map(RateWindow::reset_at)
                .max()
        };
        let reset_at = reset_at.unwrap_or(now);

        if !allowed {
            debug!(key, tier = tier.as_str(), %reset_at, "rate limit exceeded");
            metrics::counter!("mailrisk_rate_limited_total", "tier" => tier.as_str()).increment(1);
        }

        Ok(RateDecision {
            allowed,
            remaining,
            reset_at,
            windows,
        })
    }
}
