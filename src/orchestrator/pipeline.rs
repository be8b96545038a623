use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::types::new_id;
use super::{
    CheckDetail, CheckName, CheckOutcomes, CheckResult, Inner, Outcome, ValidationOptions, ValidationResult,
    Validator,
};
use crate::dns::DnsReport;
use crate::heuristics::{CatchAllReport, detect_role};
use crate::scoring::RiskLevel;
use crate::smtp::{SmtpResult, SmtpVerdict};
use crate::validator::{EmailAddress, SyntaxReport, check_syntax_with_mode};

pub(crate) const INVALID_SYNTAX: &str = "Invalid email syntax";
pub(crate) const NO_MAIL_SERVERS: &str = "Domain has no valid mail servers";

impl Validator {
    /// Validates one address. Never fails: every problem ends up in the
    /// returned result.
    #[instrument(skip(self, options))]
    pub async fn validate_one(&self, email: &str, options: &ValidationOptions) -> ValidationResult {
        let started = Instant::now();
        let result = self.inner.run(email, options).await;

        let outcome = match (&result.status, result.is_valid) {
            (Some(_), _) => "error",
            (None, true) => "valid",
            (None, false) => "invalid",
        };
        metrics::counter!("mailrisk_validations_total", "outcome" => outcome).increment(1);
        metrics::histogram!("mailrisk_validation_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            is_valid = result.is_valid,
            score = result.score,
            risk = %result.risk_level,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "validation finished"
        );
        result
    }
}

impl Inner {
    async fn run(&self, email: &str, options: &ValidationOptions) -> ValidationResult {
        let email = email.trim();
        let syntax = check_syntax_with_mode(email, self.pipeline.syntax_mode);
        let Some(address) = syntax.address() else {
            debug!(reasons = ?syntax.reasons, "syntax check failed");
            let mut checks = BTreeMap::new();
            checks.insert(CheckName::Syntax, syntax_check(&syntax, 0.0));
            let result = terminal(email, checks, INVALID_SYNTAX);
            self.finish(None, &result).await;
            return result;
        };

        // shallow results lack an SMTP verdict and must not answer deep requests
        let depth = if options.deep { "deep" } else { "shallow" };
        let cache_key = format!("result:{depth}:{}", email.to_lowercase());
        if options.use_cache {
            if let Some(cached) = self.memo.lookup::<ValidationResult>(&cache_key).await {
                debug!("served from result cache");
                return cached;
            }
        }

        let dns = match self.dns.resolve(&address.ascii_domain).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "DNS resolution failed");
                DnsReport::default()
            }
        };
        if !dns.record.is_mail_capable() {
            let weights = self.scorer.weights();
            let mut checks = BTreeMap::new();
            checks.insert(CheckName::Syntax, syntax_check(&syntax, weights.syntax));
            checks.insert(CheckName::Dns, dns_check(&dns, 0.0));
            let result = terminal(email, checks, NO_MAIL_SERVERS);
            self.finish(Some(&cache_key), &result).await;
            return result;
        }

        let outcomes = self.fan_out(email, syntax, dns, &address, options).await;
        let score = self.scorer.score(&outcomes);
        let is_valid = is_valid(&outcomes);
        let checks = check_results(&outcomes, &score.contributions);
        for (name, check) in &checks {
            let label = match (check.performed, check.passed, check.error.is_some()) {
                (false, _, _) => "skipped",
                (true, _, true) => "error",
                (true, true, false) => "passed",
                (true, false, false) => "failed",
            };
            metrics::counter!("mailrisk_checks_total", "check" => name.as_str(), "result" => label).increment(1);
        }

        let result = ValidationResult {
            id: new_id(),
            email: email.to_string(),
            is_valid,
            score: score.value,
            risk_level: score.risk_level,
            checks,
            created_at: Utc::now(),
            error: None,
            status: None,
        };
        self.finish(Some(&cache_key), &result).await;
        result
    }

    async fn fan_out(
        &self,
        email: &str,
        syntax: SyntaxReport,
        dns: DnsReport,
        address: &EmailAddress,
        options: &ValidationOptions,
    ) -> CheckOutcomes {
        let domain = address.ascii_domain.as_str();

        // smtp and catch-all have separate ceilings; a slow catch-all must
        // not discard a verdict that already arrived
        let probing = async {
            if !options.deep {
                return (Outcome::Skipped("shallow validation"), Outcome::Skipped("shallow validation"));
            }
            let hosts = dns.record.mail_hosts();
            let smtp = match self.bounded("smtp", self.prober.probe(&address.to_ascii(), &hosts)).await {
                Ok(smtp) => smtp,
                Err(err) => return (Outcome::Failed(err), Outcome::Skipped("smtp check failed")),
            };
            let catch_all = if smtp.verdict == SmtpVerdict::Deliverable {
                self.bounded("catch_all", self.catch_all.detect(domain, &hosts))
                    .await
                    .map_or_else(Outcome::Failed, Outcome::Done)
            } else {
                Outcome::Skipped("mailbox not accepted")
            };
            (Outcome::Done(smtp), catch_all)
        };
        let heuristics = async {
            (
                self.typo.detect(&address.domain),
                detect_role(&address.local_part),
                self.spam_traps.check(email),
            )
        };

        let ((smtp, catch_all), disposable, reputation, heuristics) = tokio::join!(
            probing,
            self.bounded("disposable", self.disposable.is_disposable(domain)),
            self.bounded("reputation", self.reputation.check_reputation(domain)),
            self.bounded("heuristics", heuristics),
        );

        let (typo, role, spam_trap) = match heuristics {
            Ok((typo, role, trap)) => (Outcome::Done(typo), Outcome::Done(role), Outcome::Done(trap)),
            Err(err) => (Outcome::Failed(err.clone()), Outcome::Failed(err.clone()), Outcome::Failed(err)),
        };

        CheckOutcomes {
            syntax,
            dns,
            smtp,
            catch_all,
            disposable: disposable.map_or_else(Outcome::Failed, Outcome::Done),
            reputation: reputation.map_or_else(Outcome::Failed, Outcome::Done),
            typo,
            role,
            spam_trap,
        }
    }

    async fn bounded<T>(&self, branch: &'static str, work: impl Future<Output = T>) -> Result<T, String> {
        let ceiling = self.pipeline.fanout_timeout();
        tokio::time::timeout(ceiling, work).await.map_err(|_| {
            warn!(branch, ceiling_ms = ceiling.as_millis() as u64, "check branch timed out");
            format!("{branch} check timed out after {} ms", ceiling.as_millis())
        })
    }

    /// Caches (when `cache_key` is given) and stores a finished result.
    async fn finish(&self, cache_key: Option<&str>, result: &ValidationResult) {
        if let Some(key) = cache_key {
            self.memo
                .remember(key, result, self.pipeline.result_cache_ttl())
                .await;
        }
        if let Err(err) = self.results.store(result).await {
            warn!(id = %result.id, error = %err, "result store rejected validation result");
        }
    }
}

/// Mail-capable, not disposable, not a trap, and not refused by SMTP.
fn is_valid(checks: &CheckOutcomes) -> bool {
    let rejected = checks
        .smtp
        .done()
        .is_some_and(|smtp| smtp.verdict == SmtpVerdict::Rejected);
    let disposable = checks.disposable.done().is_some_and(|v| v.is_disposable);
    let trap = checks.spam_trap.done().is_some_and(|r| r.is_trap());
    checks.syntax.valid && checks.dns.record.is_mail_capable() && !disposable && !trap && !rejected
}

fn terminal(email: &str, checks: BTreeMap<CheckName, CheckResult>, error: &str) -> ValidationResult {
    let score: f64 = checks.values().map(|c| c.score_contribution).sum();
    ValidationResult {
        id: new_id(),
        email: email.to_string(),
        is_valid: false,
        score,
        risk_level: RiskLevel::from_risk(100.0 - score),
        checks,
        created_at: Utc::now(),
        error: Some(error.to_string()),
        status: None,
    }
}

fn syntax_check(syntax: &SyntaxReport, contribution: f64) -> CheckResult {
    CheckResult {
        performed: true,
        passed: syntax.valid,
        score_contribution: contribution,
        error: (!syntax.valid).then(|| syntax.reasons.join("; ")),
        detail: CheckDetail::Syntax(syntax.clone()),
    }
}

fn dns_check(dns: &DnsReport, contribution: f64) -> CheckResult {
    let error = if !dns.failures.is_empty() {
        Some(
            dns.failures
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    } else if !dns.record.is_mail_capable() {
        Some(NO_MAIL_SERVERS.to_string())
    } else {
        None
    };
    CheckResult {
        performed: true,
        passed: dns.record.is_mail_capable(),
        score_contribution: contribution,
        error,
        detail: CheckDetail::Dns(dns.clone()),
    }
}

fn check_results(checks: &CheckOutcomes, contributions: &BTreeMap<CheckName, f64>) -> BTreeMap<CheckName, CheckResult> {
    let points = |name: CheckName| contributions.get(&name).copied().unwrap_or(0.0);
    let mut results = BTreeMap::new();

    results.insert(CheckName::Syntax, syntax_check(&checks.syntax, points(CheckName::Syntax)));
    results.insert(CheckName::Dns, dns_check(&checks.dns, points(CheckName::Dns)));
    results.insert(
        CheckName::Smtp,
        convert(&checks.smtp, points(CheckName::Smtp), |smtp: &SmtpResult| {
            (smtp.valid, smtp.error.clone(), CheckDetail::Smtp(smtp.clone()))
        }),
    );
    results.insert(
        CheckName::Disposable,
        convert(&checks.disposable, points(CheckName::Disposable), |v| {
            (!v.is_disposable, v.error.clone(), CheckDetail::Disposable(v.clone()))
        }),
    );
    results.insert(
        CheckName::Reputation,
        convert(&checks.reputation, points(CheckName::Reputation), |r| {
            (r.risk_level != RiskLevel::High, r.error.clone(), CheckDetail::Reputation(r.clone()))
        }),
    );
    results.insert(
        CheckName::Typo,
        convert(&checks.typo, points(CheckName::Typo), |s| {
            (s.is_none(), None, CheckDetail::Typo { suggestion: s.clone() })
        }),
    );
    results.insert(
        CheckName::RoleAccount,
        convert(&checks.role, points(CheckName::RoleAccount), |r| {
            (!r.is_role, None, CheckDetail::RoleAccount(r.clone()))
        }),
    );
    results.insert(
        CheckName::SpamTrap,
        convert(&checks.spam_trap, points(CheckName::SpamTrap), |r| {
            (!r.is_trap(), None, CheckDetail::SpamTrap(r.clone()))
        }),
    );
    results.insert(
        CheckName::CatchAll,
        convert(&checks.catch_all, points(CheckName::CatchAll), |r: &CatchAllReport| {
            (!r.is_catch_all, r.error.clone(), CheckDetail::CatchAll(r.clone()))
        }),
    );
    results
}

fn convert<T>(
    outcome: &Outcome<T>,
    contribution: f64,
    describe: impl FnOnce(&T) -> (bool, Option<String>, CheckDetail),
) -> CheckResult {
    match outcome {
        Outcome::Done(value) => {
            let (passed, error, detail) = describe(value);
            CheckResult {
                performed: true,
                passed,
                score_contribution: contribution,
                detail,
                error,
            }
        }
        Outcome::Skipped(reason) => CheckResult {
            score_contribution: contribution,
            ..CheckResult::skipped(*reason)
        },
        Outcome::Failed(error) => CheckResult {
            performed: true,
            passed: false,
            score_contribution: contribution,
            detail: CheckDetail::Skipped {
                reason: "check did not complete".to_string(),
            },
            error: Some(error.clone()),
        },
    }
}
