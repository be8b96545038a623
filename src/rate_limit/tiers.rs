use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn limits(&self) -> TierLimits {
        match self {
            Self::Free => TierLimits::new(2, 30, 500, 5),
            Self::Basic => TierLimits::new(5, 100, 2_000, 10),
            Self::Premium => TierLimits::new(10, 300, 5_000, 20),
            Self::Enterprise => TierLimits::new(50, 1_000, 20_000, 100),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

/// Request allowance of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub per_second: u64,
    pub per_minute: u64,
    pub per_hour: u64,
    /// Extra requests tolerated inside a single second.
    pub burst: u64,
}

impl TierLimits {
    pub const fn new(per_second: u64, per_minute: u64, per_hour: u64, burst: u64) -> Self {
        Self {
            per_second,
            per_minute,
            per_hour,
            burst,
        }
    }

    pub fn limit_for(&self, granularity: Granularity) -> u64 {
        match granularity {
            Granularity::Second => self.per_second + self.burst,
            Granularity::Minute => self.per_minute,
            Granularity::Hour => self.per_hour,
        }
    }
}

/// Fixed window sizes tracked for every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Self::Second, Self::Minute, Self::Hour];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }

    pub fn length(&self) -> Duration {
        Duration::from_secs(self.seconds())
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
        }
    }
}
