//! Validator configuration: TOML file, then `MAILRISK_*` overrides.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::disposable::DisposableOptions;
use crate::dns::DnsOptions;
use crate::orchestrator::MAX_BATCH;
use crate::reputation::ReputationOptions;
use crate::scoring::ScoreWeights;
use crate::smtp::SmtpOptions;
use crate::validator::SyntaxMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{var}='{value}': {message}")]
    Env {
        var: String,
        value: String,
        message: String,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub syntax_mode: SyntaxMode,
    /// Ceiling for each fan-out branch of one validation.
    pub fanout_timeout_ms: u64,
    pub result_cache_ttl_secs: u64,
    pub default_batch_size: usize,
    pub max_batch: usize,
    pub catch_all_probes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            syntax_mode: SyntaxMode::Strict,
            fanout_timeout_ms: 30_000,
            result_cache_ttl_secs: 3_600,
            default_batch_size: 50,
            max_batch: MAX_BATCH,
            catch_all_probes: 3,
        }
    }
}

impl PipelineConfig {
    pub fn fanout_timeout(&self) -> Duration {
        Duration::from_millis(self.fanout_timeout_ms)
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use Redis instead of process memory (needs the `with-redis` feature).
    pub redis_url: Option<String>,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "mailrisk".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Admit requests when the counter backend cannot be reached. Off by
    /// default: an unreachable backend turns requests away.
    pub fail_open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    pub pipeline: PipelineConfig,
    pub dns: DnsOptions,
    pub smtp: SmtpOptions,
    pub disposable: DisposableOptions,
    pub reputation: ReputationOptions,
    pub scoring: ScoreWeights,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    /// JSON file of spam trap patterns; built-in patterns when unset.
    pub spam_trap_file: Option<PathBuf>,
}

impl ValidatorConfig {
    /// Reads `path` when given, applies the process environment, validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `MAILRISK_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(raw) = var("MAILRISK_DNS_TIMEOUT_MS") {
            self.dns.timeout_ms = parse("MAILRISK_DNS_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_SMTP_HELO_DOMAIN") {
            self.smtp.helo_domain = raw;
        }
        if let Some(raw) = var("MAILRISK_SMTP_MAIL_FROM") {
            self.smtp.mail_from = raw;
        }
        if let Some(raw) = var("MAILRISK_SMTP_PORT") {
            self.smtp.port = parse("MAILRISK_SMTP_PORT", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_SMTP_HOST_TIMEOUT_MS") {
            self.smtp.host_timeout_ms = parse("MAILRISK_SMTP_HOST_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_SMTP_MAX_CONNECTIONS") {
            self.smtp.max_connections = parse("MAILRISK_SMTP_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_FANOUT_TIMEOUT_MS") {
            self.pipeline.fanout_timeout_ms = parse("MAILRISK_FANOUT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_BATCH_SIZE") {
            self.pipeline.default_batch_size = parse("MAILRISK_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_MAX_BATCH") {
            self.pipeline.max_batch = parse("MAILRISK_MAX_BATCH", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_REPUTATION_TIMEOUT_MS") {
            self.reputation.factor_timeout_ms = parse("MAILRISK_REPUTATION_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_UNVERIFIED_SMTP_CREDIT") {
            self.scoring.unverified_smtp_credit = parse("MAILRISK_UNVERIFIED_SMTP_CREDIT", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_DISPOSABLE_API_URL") {
            self.disposable.api_url = Some(raw);
        }
        if let Some(raw) = var("MAILRISK_DISPOSABLE_API_KEY") {
            self.disposable.api_key = Some(raw);
        }
        if let Some(raw) = var("MAILRISK_SPAM_TRAP_FILE") {
            self.spam_trap_file = Some(PathBuf::from(raw));
        }
        if let Some(raw) = var("MAILRISK_RATE_LIMIT_FAIL_OPEN") {
            self.rate_limit.fail_open = parse("MAILRISK_RATE_LIMIT_FAIL_OPEN", &raw)?;
        }
        if let Some(raw) = var("MAILRISK_REDIS_URL") {
            self.cache.redis_url = Some(raw);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if pipeline.default_batch_size == 0 {
            return Err(ConfigError::Invalid("pipeline.default_batch_size must be > 0".into()));
        }
        if pipeline.max_batch == 0 || pipeline.max_batch > MAX_BATCH {
            return Err(ConfigError::Invalid(format!(
                "pipeline.max_batch must be within 1..={MAX_BATCH}"
            )));
        }
        let timeouts = [
            ("pipeline.fanout_timeout_ms", pipeline.fanout_timeout_ms),
            ("dns.timeout_ms", self.dns.timeout_ms),
            ("smtp.connect_timeout_ms", self.smtp.connect_timeout_ms),
            ("smtp.command_timeout_ms", self.smtp.command_timeout_ms),
            ("smtp.host_timeout_ms", self.smtp.host_timeout_ms),
            ("disposable.timeout_ms", self.disposable.timeout_ms),
            ("reputation.factor_timeout_ms", self.reputation.factor_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be > 0")));
        }
        if self.smtp.max_connections == 0 {
            return Err(ConfigError::Invalid("smtp.max_connections must be > 0".into()));
        }
        Ok(())
    }
}

fn parse<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Env {
        var: var.to_string(),
        value: raw.to_string(),
        message: err.to_string(),
    })
}
