//! Composite deliverability score.
//!
//! `ValidationResult::score` is higher-is-better. The reputation checker
//! reports a risk (higher is worse); it is inverted here and nowhere else.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::orchestrator::{CheckName, CheckOutcomes, Outcome};
use crate::smtp::SmtpVerdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const HIGH_THRESHOLD: f64 = 70.0;
    pub const MEDIUM_THRESHOLD: f64 = 40.0;

    /// Classifies a risk in `[0, 100]`, higher is worse.
    pub fn from_risk(risk: f64) -> Self {
        if risk >= Self::HIGH_THRESHOLD {
            Self::High
        } else if risk >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points per check. Penalties are subtracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub syntax: f64,
    pub mx: f64,
    pub address: f64,
    pub ptr: f64,
    pub smtp_verified: f64,
    /// Credit when no server gave a definitive answer, or SMTP was skipped.
    pub unverified_smtp_credit: f64,
    pub not_disposable: f64,
    pub no_spam_trap: f64,
    pub reputation: f64,
    pub role_penalty: f64,
    pub catch_all_penalty: f64,
    pub typo_penalty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            syntax: 20.0,
            mx: 15.0,
            address: 10.0,
            ptr: 5.0,
            smtp_verified: 20.0,
            unverified_smtp_credit: 10.0,
            not_disposable: 10.0,
            no_spam_trap: 10.0,
            reputation: 10.0,
            role_penalty: 5.0,
            catch_all_penalty: 5.0,
            typo_penalty: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Deliverability in `[0, 100]`, rounded to 0.1.
    pub value: f64,
    pub risk_level: RiskLevel,
    pub contributions: BTreeMap<CheckName, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: ScoreWeights,
}

impl RiskScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, checks: &CheckOutcomes) -> Score {
        let w = &self.weights;
        let mut contributions = BTreeMap::new();

        contributions.insert(CheckName::Syntax, if checks.syntax.valid { w.syntax } else { 0.0 });

        let record = &checks.dns.record;
        let mut dns = 0.0;
        if record.has_mx() {
            dns += w.mx;
        }
        if record.has_address() {
            dns += w.address;
        }
        if record.has_ptr() {
            dns += w.ptr;
        }
        contributions.insert(CheckName::Dns, dns);

        let smtp = match checks.smtp.done().map(|r| r.verdict) {
            Some(SmtpVerdict::Deliverable) => w.smtp_verified,
            Some(SmtpVerdict::Rejected) => 0.0,
            Some(SmtpVerdict::Unverified) | None => w.unverified_smtp_credit,
        };
        contributions.insert(CheckName::Smtp, smtp);

        let disposable = checks.disposable.done().is_some_and(|v| v.is_disposable);
        contributions.insert(CheckName::Disposable, if disposable { 0.0 } else { w.not_disposable });

        let trap = checks.spam_trap.done().is_some_and(|r| r.is_trap());
        contributions.insert(CheckName::SpamTrap, if trap { 0.0 } else { w.no_spam_trap });

        // a reputation branch that never finished counts as the worst risk
        let reputation_risk = match &checks.reputation {
            Outcome::Done(report) => report.score,
            Outcome::Skipped(_) | Outcome::Failed(_) => 100.0,
        };
        contributions.insert(
            CheckName::Reputation,
            w.reputation * (100.0 - reputation_risk.clamp(0.0, 100.0)) / 100.0,
        );

        let role = checks.role.done().is_some_and(|r| r.is_role);
        contributions.insert(CheckName::RoleAccount, if role { -w.role_penalty } else { 0.0 });

        let catch_all = checks.catch_all.done().is_some_and(|r| r.is_catch_all);
        contributions.insert(CheckName::CatchAll, if catch_all { -w.catch_all_penalty } else { 0.0 });

        let typo = checks.typo.done().is_some_and(|s| s.is_some());
        contributions.insert(CheckName::Typo, if typo { -w.typo_penalty } else { 0.0 });

        let total: f64 = contributions.values().sum();
        let value = round_tenth(total.clamp(0.0, 100.0));
        Score {
            value,
            risk_level: RiskLevel::from_risk(100.0 - value),
            contributions,
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
