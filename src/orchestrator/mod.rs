//! Validation orchestration: syntax, DNS, concurrent checks, scoring.
//!
//! ```text
//! syntax ──▶ dns ──▶ ┬ smtp (+ catch-all) ┬──▶ score ──▶ cache, store
//!                    ├ disposable         │
//!                    ├ reputation         │
//!                    └ heuristics         ┘
//! ```
//!
//! An invalid address stops after syntax; a domain without MX or address
//! records stops after DNS. Each fan-out branch runs under its own ceiling
//! and degrades on its own.

mod batch;
mod builder;
mod error;
mod pipeline;
mod types;

pub use builder::ValidatorBuilder;
pub use error::{BuildError, RequestError};
pub use types::{
    BatchResult, BatchSummary, CheckDetail, CheckName, CheckOutcomes, CheckResult, MAX_BATCH, Outcome,
    ValidationOptions, ValidationRequest, ValidationResult,
};

use std::sync::Arc;

use crate::cache::Memoizer;
use crate::config::{PipelineConfig, RateLimitConfig};
use crate::disposable::DisposableDetector;
use crate::dns::DnsResolver;
use crate::heuristics::{CatchAllDetector, SpamTrapDetector, TypoDetector};
use crate::rate_limit::RateGate;
use crate::reputation::ReputationChecker;
use crate::results::ResultStore;
use crate::scoring::RiskScorer;
use crate::smtp::SmtpProber;

/// Entry point of the crate. Cheap to clone; clones share every backend.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<Inner>,
}

struct Inner {
    memo: Arc<Memoizer>,
    dns: Arc<DnsResolver>,
    prober: Arc<SmtpProber>,
    catch_all: CatchAllDetector,
    disposable: DisposableDetector,
    reputation: ReputationChecker,
    typo: TypoDetector,
    spam_traps: Arc<SpamTrapDetector>,
    scorer: RiskScorer,
    results: Arc<dyn ResultStore>,
    gate: RateGate,
    rate_limit: RateLimitConfig,
    pipeline: PipelineConfig,
}

impl Validator {
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Runtime-editable spam trap patterns.
    pub fn spam_traps(&self) -> &SpamTrapDetector {
        &self.inner.spam_traps
    }

    pub fn results(&self) -> Arc<dyn ResultStore> {
        Arc::clone(&self.inner.results)
    }

    /// Options with the configured default batch size.
    pub fn default_options(&self) -> ValidationOptions {
        ValidationOptions {
            batch_size: self.inner.pipeline.default_batch_size,
            ..ValidationOptions::default()
        }
    }
}

#[cfg(test)]
mod tests;
