use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::MailAuthStatus;
use crate::scoring::RiskLevel;

/// One input of the reputation score. Higher factor risk is worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    DomainAge,
    Blacklist,
    Tls,
    WebPresence,
    MailAuth,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::DomainAge,
        Factor::Blacklist,
        Factor::Tls,
        Factor::WebPresence,
        Factor::MailAuth,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Self::DomainAge => 0.25,
            Self::Blacklist => 0.30,
            Self::Tls | Self::WebPresence | Self::MailAuth => 0.15,
        }
    }

    /// Risk assumed when the factor could not be measured.
    pub fn neutral(self) -> f64 {
        match self {
            Self::DomainAge | Self::WebPresence | Self::MailAuth => 50.0,
            Self::Blacklist => 0.0,
            Self::Tls => 100.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DomainAge => "domain_age",
            Self::Blacklist => "blacklist",
            Self::Tls => "tls",
            Self::WebPresence => "web_presence",
            Self::MailAuth => "mail_auth",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DNSBL zones a domain was found on, out of those that answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistHits {
    pub listed_on: Vec<String>,
    pub checked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactorDetail {
    DomainAge { age_days: i64 },
    Blacklist(BlacklistHits),
    Tls { valid: bool },
    WebPresence { status: u16 },
    MailAuth { status: MailAuthStatus },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorReport {
    pub risk: f64,
    pub weight: f64,
    pub detail: Option<FactorDetail>,
    /// Set when the neutral value was used instead of a measurement.
    pub error: Option<String>,
}

impl FactorReport {
    pub(crate) fn measured(factor: Factor, risk: f64, detail: FactorDetail) -> Self {
        Self {
            risk: risk.clamp(0.0, 100.0),
            weight: factor.weight(),
            detail: Some(detail),
            error: None,
        }
    }

    pub(crate) fn neutral(factor: Factor, error: impl ToString) -> Self {
        Self {
            risk: factor.neutral(),
            weight: factor.weight(),
            detail: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Reputation of a sending domain. `score` is a risk: higher is worse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationReport {
    pub domain: String,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub details: BTreeMap<Factor, FactorReport>,
    pub error: Option<String>,
}

impl ReputationReport {
    pub(crate) fn from_factors(domain: &str, details: BTreeMap<Factor, FactorReport>) -> Self {
        let total: f64 = details.values().map(|f| f.risk * f.weight).sum();
        let score = (total.clamp(0.0, 100.0) * 10.0).round() / 10.0;
        Self {
            domain: domain.to_string(),
            score,
            risk_level: RiskLevel::from_risk(score),
            details,
            error: None,
        }
    }

    /// Worst possible report, used when the check itself could not run.
    pub(crate) fn ceiling(domain: &str, error: impl ToString) -> Self {
        Self {
            domain: domain.to_string(),
            score: 100.0,
            risk_level: RiskLevel::High,
            details: BTreeMap::new(),
            error: Some(error.to_string()),
        }
    }
}
