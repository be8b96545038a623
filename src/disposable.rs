//! Disposable (throwaway) mailbox provider detection.
//!
//! A built-in list is consulted first, then an optional remote lookup. Remote
//! failures never flag an address: this check fails open.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

static BUILTIN_DOMAINS: phf::Set<&'static str> = phf::phf_set! {
    "10minutemail.com",
    "20minutemail.com",
    "33mail.com",
    "dispostable.com",
    "emailondeck.com",
    "fakeinbox.com",
    "getairmail.com",
    "getnada.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "guerrillamailblock.com",
    "harakirimail.com",
    "incognitomail.org",
    "mailcatch.com",
    "maildrop.cc",
    "mailinator.com",
    "mailinator.net",
    "mailnesia.com",
    "mintemail.com",
    "mohmal.com",
    "mytemp.email",
    "sharklasers.com",
    "spamgourmet.com",
    "temp-mail.org",
    "tempail.com",
    "tempmail.com",
    "tempmailo.com",
    "tempr.email",
    "throwawaymail.com",
    "trashmail.com",
    "yopmail.com",
    "yopmail.net",
};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("disposable lookup request failed: {0}")]
    Request(String),
    #[error("disposable lookup returned HTTP {0}")]
    Status(u16),
    #[error("disposable lookup timed out")]
    Timeout,
}

/// Remote source of truth for disposable domains.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisposableLookup: Send + Sync {
    async fn is_disposable(&self, domain: &str) -> Result<bool, LookupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    BuiltinList,
    Remote,
    /// The remote lookup failed and the domain was let through.
    FailOpen,
    NotListed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposableVerdict {
    pub is_disposable: bool,
    pub source: VerdictSource,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisposableOptions {
    /// Endpoint answering `GET {api_url}?domain=...` with `{"is_disposable": bool}`.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub extra_domains: Vec<String>,
}

impl Default for DisposableOptions {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            timeout_ms: 5_000,
            extra_domains: Vec::new(),
        }
    }
}

impl DisposableOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub struct DisposableDetector {
    extra: HashSet<String>,
    remote: Option<Arc<dyn DisposableLookup>>,
    timeout: Duration,
}

impl DisposableDetector {
    pub fn new(options: &DisposableOptions, remote: Option<Arc<dyn DisposableLookup>>) -> Self {
        Self {
            extra: options
                .extra_domains
                .iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .collect(),
            remote,
            timeout: options.timeout(),
        }
    }

    pub fn is_listed(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        BUILTIN_DOMAINS.contains(domain.as_str()) || self.extra.contains(&domain)
    }

    pub async fn is_disposable(&self, domain: &str) -> DisposableVerdict {
        if self.is_listed(domain) {
            return DisposableVerdict {
                is_disposable: true,
                source: VerdictSource::BuiltinList,
                error: None,
            };
        }

        let Some(remote) = &self.remote else {
            return DisposableVerdict {
                is_disposable: false,
                source: VerdictSource::NotListed,
                error: None,
            };
        };

        let outcome = tokio::time::timeout(self.timeout, remote.is_disposable(domain))
            .await
            .unwrap_or(Err(LookupError::Timeout));
        match outcome {
            Ok(is_disposable) => DisposableVerdict {
                is_disposable,
                source: VerdictSource::Remote,
                error: None,
            },
            Err(err) => {
                warn!(domain, error = %err, "disposable lookup failed, assuming not disposable");
                DisposableVerdict {
                    is_disposable: false,
                    source: VerdictSource::FailOpen,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(feature = "with-network")]
pub use self::http::HttpDisposableLookup;

#[cfg(feature = "with-network")]
mod http {
    use async_trait::async_trait;
    use serde::Deserialize;

    use super::{DisposableLookup, DisposableOptions, LookupError};

    #[derive(Deserialize)]
    struct ApiResponse {
        #[serde(default)]
        is_disposable: bool,
    }

    pub struct HttpDisposableLookup {
        client: reqwest::Client,
        url: String,
        api_key: Option<String>,
    }

    impl HttpDisposableLookup {
        /// `None` when no endpoint is configured.
        pub fn from_options(options: &DisposableOptions) -> Result<Option<Self>, LookupError> {
            let Some(url) = options.api_url.clone() else {
                return Ok(None);
            };
            let client = reqwest::Client::builder()
                .timeout(options.timeout())
                .build()
                .map_err(|err| LookupError::Request(err.to_string()))?;
            Ok(Some(Self {
                client,
                url,
                api_key: options.api_key.clone(),
            }))
        }
    }

    #[async_trait]
    impl DisposableLookup for HttpDisposableLookup {
        async fn is_disposable(&self, domain: &str) -> Result<bool, LookupError> {
            let mut request = self.client.get(&self.url).query(&[("domain", domain)]);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }
            let response = request
                .send()
                .await
                .map_err(|err| LookupError::Request(err.to_string()))?;
            if !response.status().is_success() {
                return Err(LookupError::Status(response.status().as_u16()));
            }
            let body: ApiResponse = response
                .json()
                .await
                .map_err(|err| LookupError::Request(err.to_string()))?;
            Ok(body.is_disposable)
        }
    }
}
