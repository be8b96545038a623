use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, warn};

use super::{
    BlacklistHits, Factor, FactorDetail, FactorReport, ProbeError, ReputationOptions, ReputationProbes,
    ReputationReport,
};
use crate::auth::MailAuthStatus;
use crate::cache::Memoizer;
use crate::dns::encode_domain;

/// Registration age at which a domain stops carrying age risk.
const MATURE_AGE_DAYS: f64 = 5.0 * 365.0;

/// Weighs five independent measurements into a domain risk score.
///
/// A factor that errors or overruns its deadline falls back to its neutral
/// value. A malformed domain or a panicking factor yields the ceiling
/// (score 100, high) instead.
pub struct ReputationChecker {
    probes: Arc<dyn ReputationProbes>,
    memo: Arc<Memoizer>,
    options: ReputationOptions,
}

impl ReputationChecker {
    pub fn new(probes: Arc<dyn ReputationProbes>, memo: Arc<Memoizer>, options: ReputationOptions) -> Self {
        Self { probes, memo, options }
    }

    pub async fn check_reputation(&self, domain: &str) -> ReputationReport {
        let ascii = match encode_domain(domain) {
            Ok(ascii) => ascii,
            Err(err) => {
                warn!(domain, error = %err, "reputation check on malformed domain");
                return ReputationReport::ceiling(domain, err);
            }
        };

        let key = format!("reputation:{ascii}");
        if let Some(report) = self.memo.lookup::<ReputationReport>(&key).await {
            return report;
        }

        let report = self.measure(&ascii).await;
        if report.error.is_none() {
            self.memo.remember(&key, &report, self.options.cache_ttl()).await;
        }
        report
    }

    async fn measure(&self, domain: &str) -> ReputationReport {
        let age = self.spawn(domain, |probes, d| async move { probes.domain_age(&d).await });
        let blacklist = self.spawn(domain, |probes, d| async move { probes.blacklist_listings(&d).await });
        let tls = self.spawn(domain, |probes, d| async move { probes.certificate(&d).await });
        let web = self.spawn(domain, |probes, d| async move { probes.web_presence(&d).await });
        let mail_auth = self.spawn(domain, |probes, d| async move { probes.mail_auth(&d).await });

        let (age, blacklist, tls, web, mail_auth) = tokio::join!(age, blacklist, tls, web, mail_auth);

        let assembled = assemble(age, blacklist, tls, web, mail_auth);

        match assembled {
            Ok(details) => {
                let report = ReputationReport::from_factors(domain, details);
                debug!(domain, score = report.score, level = %report.risk_level, "reputation measured");
                report
            }
            Err(err) => {
                error!(domain, error = %err, "reputation factor task failed");
                ReputationReport::ceiling(domain, format!("reputation check failed: {err}"))
            }
        }
    }

    fn spawn<T, F, Fut>(&self, domain: &str, probe: F) -> JoinHandle<Result<T, ProbeError>>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn ReputationProbes>, String) -> Fut,
        Fut: Future<Output = Result<T, ProbeError>> + Send + 'static,
    {
        let deadline = self.options.factor_timeout();
        let measurement = probe(Arc::clone(&self.probes), domain.to_string());
        tokio::spawn(async move {
            tokio::time::timeout(deadline, measurement)
                .await
                .map_err(|_| ProbeError::Timeout)?
        })
    }
}

type Joined<T> = Result<Result<T, ProbeError>, JoinError>;

fn assemble(
    age: Joined<i64>,
    blacklist: Joined<BlacklistHits>,
    tls: Joined<bool>,
    web: Joined<u16>,
    mail_auth: Joined<MailAuthStatus>,
) -> Result<BTreeMap<Factor, FactorReport>, JoinError> {
    let mut details = BTreeMap::new();
    details.insert(Factor::DomainAge, rate(Factor::DomainAge, age, age_factor)?);
    details.insert(Factor::Blacklist, rate(Factor::Blacklist, blacklist, blacklist_factor)?);
    details.insert(
        Factor::Tls,
        rate(Factor::Tls, tls, |valid| (if valid { 0.0 } else { 100.0 }, FactorDetail::Tls { valid }))?,
    );
    details.insert(
        Factor::WebPresence,
        rate(Factor::WebPresence, web, |status| {
            (if status == 200 { 0.0 } else { 50.0 }, FactorDetail::WebPresence { status })
        })?,
    );
    details.insert(
        Factor::MailAuth,
        rate(Factor::MailAuth, mail_auth, |status| (status.risk(), FactorDetail::MailAuth { status }))?,
    );
    Ok(details)
}

/// Join errors propagate; probe errors degrade to the neutral value.
fn rate<T>(
    factor: Factor,
    joined: Joined<T>,
    score: impl FnOnce(T) -> (f64, FactorDetail),
) -> Result<FactorReport, JoinError> {
    Ok(match joined? {
        Ok(observed) => {
            let (risk, detail) = score(observed);
            FactorReport::measured(factor, risk, detail)
        }
        Err(err) => {
            warn!(%factor, error = %err, "reputation factor degraded to neutral");
            FactorReport::neutral(factor, err)
        }
    })
}

fn age_factor(age_days: i64) -> (f64, FactorDetail) {
    let risk = (MATURE_AGE_DAYS - age_days as f64) / MATURE_AGE_DAYS * 100.0;
    (risk, FactorDetail::DomainAge { age_days })
}

fn blacklist_factor(hits: BlacklistHits) -> (f64, FactorDetail) {
    let risk = if hits.checked == 0 {
        0.0
    } else {
        hits.listed_on.len() as f64 / hits.checked as f64 * 100.0
    };
    (risk, FactorDetail::Blacklist(hits))
}
