#![forbid(unsafe_code)]
//! mailrisk: validation d'adresses e-mail et score de risque.
//!
//! Syntax, DNS, SMTP mailbox probing, disposable providers, domain
//! reputation and local heuristics, combined by [`Validator`] into one
//! 0-100 score per address.

pub mod auth;
pub mod cache;
pub mod config;
pub mod disposable;
pub mod dns;
pub mod heuristics;
pub mod orchestrator;
pub mod rate_limit;
pub mod reputation;
pub mod results;
pub mod scoring;
pub mod smtp;
pub mod validator;

#[cfg(feature = "with-network")]
mod tls;

#[cfg(test)]
mod testing;

pub use cache::{CacheError, CacheStore, MemoryCache, NullCache};
#[cfg(feature = "with-redis")]
pub use cache::RedisCache;
pub use config::{ConfigError, ValidatorConfig};
pub use orchestrator::{
    BatchResult, BatchSummary, BuildError, CheckDetail, CheckName, CheckResult, RequestError,
    ValidationOptions, ValidationRequest, ValidationResult, Validator, ValidatorBuilder,
};
pub use rate_limit::{RateDecision, RateGate, Tier};
pub use reputation::ReputationReport;
pub use results::{MemoryResultStore, ResultStore, StoreError};
pub use scoring::{RiskLevel, ScoreWeights};
pub use validator::{SyntaxMode, SyntaxReport, check_syntax};
