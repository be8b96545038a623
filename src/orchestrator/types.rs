use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestError;
use crate::disposable::DisposableVerdict;
use crate::dns::DnsReport;
use crate::heuristics::{CatchAllReport, RoleVerdict, SpamTrapReport, TypoSuggestion};
use crate::reputation::ReputationReport;
use crate::scoring::RiskLevel;
use crate::smtp::SmtpResult;
use crate::validator::SyntaxReport;

/// Upper bound on addresses per request.
pub const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    Syntax,
    Dns,
    Smtp,
    Disposable,
    Reputation,
    Typo,
    RoleAccount,
    SpamTrap,
    CatchAll,
}

impl CheckName {
    pub const ALL: [CheckName; 9] = [
        CheckName::Syntax,
        CheckName::Dns,
        CheckName::Smtp,
        CheckName::Disposable,
        CheckName::Reputation,
        CheckName::Typo,
        CheckName::RoleAccount,
        CheckName::SpamTrap,
        CheckName::CatchAll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Dns => "dns",
            Self::Smtp => "smtp",
            Self::Disposable => "disposable",
            Self::Reputation => "reputation",
            Self::Typo => "typo",
            Self::RoleAccount => "role_account",
            Self::SpamTrap => "spam_trap",
            Self::CatchAll => "catch_all",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a check observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckDetail {
    Syntax(SyntaxReport),
    Dns(DnsReport),
    Smtp(SmtpResult),
    Disposable(DisposableVerdict),
    Reputation(ReputationReport),
    Typo { suggestion: Option<TypoSuggestion> },
    RoleAccount(RoleVerdict),
    SpamTrap(SpamTrapReport),
    CatchAll(CatchAllReport),
    /// The check did not run.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub performed: bool,
    pub passed: bool,
    pub score_contribution: f64,
    pub detail: CheckDetail,
    pub error: Option<String>,
}

impl CheckResult {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self {
            performed: false,
            passed: false,
            score_contribution: 0.0,
            detail: CheckDetail::Skipped { reason: reason.into() },
            error: None,
        }
    }
}

/// Outcome of one fan-out branch before it is scored.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Skipped(&'static str),
    /// The branch overran its deadline.
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn done(&self) -> Option<&T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// Typed results of every check for one address.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcomes {
    pub syntax: SyntaxReport,
    pub dns: DnsReport,
    pub smtp: Outcome<SmtpResult>,
    pub disposable: Outcome<DisposableVerdict>,
    pub reputation: Outcome<ReputationReport>,
    pub typo: Outcome<Option<TypoSuggestion>>,
    pub role: Outcome<RoleVerdict>,
    pub spam_trap: Outcome<SpamTrapReport>,
    pub catch_all: Outcome<CatchAllReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Run SMTP and catch-all probing.
    pub deep: bool,
    pub batch_size: usize,
    pub use_cache: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            deep: true,
            batch_size: 50,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: String,
    pub email: String,
    pub is_valid: bool,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub checks: BTreeMap<CheckName, CheckResult>,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    /// Only set when the pipeline itself failed for this address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ValidationResult {
    /// Result for an address whose pipeline failed unexpectedly.
    pub(crate) fn errored(email: &str, error: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            email: email.to_string(),
            is_valid: false,
            score: 0.0,
            risk_level: RiskLevel::High,
            checks: BTreeMap::new(),
            created_at: Utc::now(),
            error: Some(error.into()),
            status: Some("Error".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Addresses whose pipeline failed, also counted as invalid.
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Same order as the input.
    pub results: Vec<ValidationResult>,
    pub summary: BatchSummary,
}

impl BatchResult {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        let valid = results.iter().filter(|r| r.is_valid).count();
        let summary = BatchSummary {
            total: results.len(),
            valid,
            invalid: results.len() - valid,
            errors: results.iter().filter(|r| r.status.is_some()).count(),
        };
        Self { results, summary }
    }
}

/// Addresses accepted for validation. Construction enforces `1..=100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    emails: Vec<String>,
    options: ValidationOptions,
}

impl ValidationRequest {
    pub fn new(emails: Vec<String>, options: ValidationOptions) -> Result<Self, RequestError> {
        check_batch_len(emails.len(), MAX_BATCH)?;
        Ok(Self { emails, options })
    }

    pub fn single(email: impl Into<String>, options: ValidationOptions) -> Self {
        Self {
            emails: vec![email.into()],
            options,
        }
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }
}

pub(crate) fn check_batch_len(len: usize, max: usize) -> Result<(), RequestError> {
    match len {
        0 => Err(RequestError::EmptyBatch),
        n if n > max => Err(RequestError::BatchTooLarge { len: n, max }),
        _ => Ok(()),
    }
}

pub(crate) fn new_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
