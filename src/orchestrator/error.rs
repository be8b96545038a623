use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::rate_limit::Tier;

/// Reasons a request is turned away before any address is looked at.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no email addresses to validate")]
    EmptyBatch,
    #[error("batch of {len} addresses exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
    #[error("rate limit exceeded for tier {tier}, retry after {reset_at}")]
    RateLimited { tier: Tier, reset_at: DateTime<Utc> },
    #[error("rate limit backend unavailable: {0}")]
    RateGateUnavailable(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("validator needs a {0}")]
    Missing(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not initialise {component}: {message}")]
    Init { component: &'static str, message: String },
}

impl BuildError {
    pub(crate) fn init(component: &'static str, err: impl ToString) -> Self {
        Self::Init {
            component,
            message: err.to_string(),
        }
    }
}
