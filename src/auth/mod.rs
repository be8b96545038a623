//! Sender authentication posture of a domain (SPF and DMARC).
//!
//! Feeds the mail-configuration factor of the reputation score: a domain
//! that publishes enforced policies is less likely to be a throwaway.

mod dmarc;
mod spf;

pub use dmarc::{DmarcIssue, DmarcPolicy, DmarcStatus};
pub use spf::{SpfIssue, SpfQualifier, SpfStatus};

use serde::{Deserialize, Serialize};

use crate::dns::{DnsError, DnsResolver, encode_domain};

const NO_MX_RISK: f64 = 40.0;
const SPF_RISK: f64 = 30.0;
const DMARC_RISK: f64 = 30.0;

/// How strictly a published policy is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrength {
    Enforced,
    Weak,
    Absent,
}

impl AuthStrength {
    /// Share of the full penalty this strength costs.
    fn penalty_share(self) -> f64 {
        match self {
            Self::Enforced => 0.0,
            Self::Weak => 0.5,
            Self::Absent => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAuthStatus {
    pub domain: String,
    pub has_mx: bool,
    pub spf: SpfStatus,
    pub dmarc: DmarcStatus,
}

impl MailAuthStatus {
    pub fn new(domain: impl Into<String>, has_mx: bool, spf_records: &[String], dmarc_records: &[String]) -> Self {
        Self {
            domain: domain.into(),
            has_mx,
            spf: spf::evaluate(spf_records),
            dmarc: dmarc::evaluate(dmarc_records),
        }
    }

    /// Risk in `[0, 100]`, higher is worse: 40 without MX, 30 per missing
    /// SPF or DMARC policy, half of that when the policy is weak.
    pub fn risk(&self) -> f64 {
        let mut risk = 0.0;
        if !self.has_mx {
            risk += NO_MX_RISK;
        }
        risk += SPF_RISK * self.spf.strength().penalty_share();
        risk += DMARC_RISK * self.dmarc.strength().penalty_share();
        risk
    }
}

/// Looks up MX, the apex TXT records and `_dmarc.<domain>`.
pub async fn check_mail_auth(resolver: &DnsResolver, domain: &str) -> Result<MailAuthStatus, DnsError> {
    let ascii = encode_domain(domain)?;
    let dmarc_name = format!("_dmarc.{ascii}");
    let (mx, spf_records, dmarc_records) = tokio::join!(
        resolver.mx_records(&ascii),
        resolver.txt_records(&ascii),
        resolver.txt_records(&dmarc_name),
    );
    Ok(MailAuthStatus::new(ascii.clone(), !mx?.is_empty(), &spf_records?, &dmarc_records?))
}

pub(crate) fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
