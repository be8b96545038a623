use async_trait::async_trait;
use thiserror::Error;

use super::BlacklistHits;
use crate::auth::MailAuthStatus;
use crate::dns::DnsError;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("registration data unavailable: {0}")]
    Registration(String),
    #[error("TLS probe failed: {0}")]
    Tls(String),
    #[error(transparent)]
    Dns(#[from] DnsError),
}

impl ProbeError {
    pub(crate) fn http(err: impl ToString) -> Self {
        Self::Http(err.to_string())
    }
}

/// Network measurements behind each reputation factor.
///
/// Implementations report what they observed; turning observations into
/// risk is left to [`ReputationChecker`](super::ReputationChecker).
#[async_trait]
pub trait ReputationProbes: Send + Sync {
    /// Days since the domain was registered.
    async fn domain_age(&self, domain: &str) -> Result<i64, ProbeError>;

    async fn blacklist_listings(&self, domain: &str) -> Result<BlacklistHits, ProbeError>;

    /// Whether `domain:443` presents a certificate that verifies.
    async fn certificate(&self, domain: &str) -> Result<bool, ProbeError>;

    /// HTTP status of `https://{domain}/`.
    async fn web_presence(&self, domain: &str) -> Result<u16, ProbeError>;

    async fn mail_auth(&self, domain: &str) -> Result<MailAuthStatus, ProbeError>;
}
