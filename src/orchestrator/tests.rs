use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::pipeline::{INVALID_SYNTAX, NO_MAIL_SERVERS};
use super::{
    CheckDetail, CheckName, MAX_BATCH, RequestError, ValidationOptions, ValidationRequest, Validator,
};
use crate::cache::{CacheError, CacheResult, CacheStore};
use crate::config::ValidatorConfig;
use crate::disposable::{LookupError, MockDisposableLookup, VerdictSource};
use crate::dns::{DomainDnsRecord, MxRecord};
use crate::rate_limit::{RateGate, Tier};
use crate::results::{MemoryResultStore, MockResultStore, ResultStore, StoreError};
use crate::scoring::RiskLevel;
use crate::smtp::SmtpVerdict;
use crate::testing::{FakeDns, FakeProbes, FakeSmtp, HostBehavior};

struct Harness {
    dns: Arc<FakeDns>,
    smtp: Arc<FakeSmtp>,
    probes: Arc<FakeProbes>,
    results: Arc<MemoryResultStore>,
    validator: Validator,
}

fn harness(dns: FakeDns, smtp: FakeSmtp) -> Harness {
    harness_with(dns, smtp, ValidatorConfig::default())
}

fn harness_with(dns: FakeDns, smtp: FakeSmtp, config: ValidatorConfig) -> Harness {
    let dns = Arc::new(dns);
    let smtp = Arc::new(smtp);
    let probes = Arc::new(FakeProbes::default());
    let results = Arc::new(MemoryResultStore::new());
    let validator = Validator::builder()
        .config(config)
        .dns_backend(dns.clone())
        .smtp_transport(smtp.clone())
        .reputation_probes(probes.clone())
        .result_store(results.clone())
        .build()
        .expect("validator builds");
    Harness {
        dns,
        smtp,
        probes,
        results,
        validator,
    }
}

/// `example.com` with a mail server that knows only `alice`.
fn healthy() -> Harness {
    harness(
        FakeDns::new().with_healthy_domain("example.com"),
        FakeSmtp::new()
            .host("mail.example.com", HostBehavior::Rcpt(550))
            .recipient("alice@example.com", 250),
    )
}

fn emails(list: &[&str]) -> Vec<String> {
    list.iter().map(|e| e.to_string()).collect()
}

fn shallow() -> ValidationOptions {
    ValidationOptions {
        deep: false,
        ..ValidationOptions::default()
    }
}

fn uncached() -> ValidationOptions {
    ValidationOptions {
        use_cache: false,
        ..ValidationOptions::default()
    }
}

#[tokio::test]
async fn invalid_syntax_touches_no_network() {
    let h = healthy();
    let result = h
        .validator
        .validate_one("not-an-email", &ValidationOptions::default())
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.error.as_deref(), Some(INVALID_SYNTAX));
    assert_eq!(result.checks.keys().collect::<Vec<_>>(), vec![&CheckName::Syntax]);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(h.dns.calls(), 0);
    assert_eq!(h.smtp.connect_count(), 0);
    assert_eq!(h.probes.calls(), 0);
}

#[tokio::test]
async fn domain_without_records_is_invalid() {
    let h = harness(FakeDns::new(), FakeSmtp::new());
    let result = h
        .validator
        .validate_one("bob@nowhere.example", &ValidationOptions::default())
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.error.as_deref(), Some(NO_MAIL_SERVERS));
    assert!(result.checks.contains_key(&CheckName::Dns));
    assert!(!result.checks[&CheckName::Dns].passed);
    assert!(!result.checks.contains_key(&CheckName::Smtp));
    assert_eq!(h.smtp.connect_count(), 0);
    assert_eq!(h.probes.calls(), 0);
}

#[tokio::test]
async fn healthy_address_is_valid_and_low_risk() {
    let h = healthy();
    let result = h
        .validator
        .validate_one("alice@example.com", &ValidationOptions::default())
        .await;

    assert!(result.is_valid, "{result:#?}");
    assert_eq!(result.score, 100.0);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!(result.error.is_none());
    assert!(result.status.is_none());
    assert_eq!(result.checks.len(), CheckName::ALL.len());
    assert!(result.checks.values().all(|check| check.performed && check.passed));
    match &result.checks[&CheckName::CatchAll].detail {
        CheckDetail::CatchAll(report) => assert!(!report.is_catch_all),
        other => panic!("unexpected catch-all detail {other:?}"),
    }
    assert_eq!(h.results.len(), 1);
}

#[tokio::test]
async fn rejected_mailbox_is_invalid_but_scored() {
    let h = healthy();
    let result = h
        .validator
        .validate_one("nobody@example.com", &ValidationOptions::default())
        .await;

    assert!(!result.is_valid);
    assert!(result.error.is_none());
    assert_eq!(result.checks[&CheckName::Smtp].score_contribution, 0.0);
    assert!(!result.checks[&CheckName::CatchAll].performed);
    assert_eq!(result.score, 80.0);
}

#[tokio::test]
async fn implicit_mx_is_probed_when_no_mx_exists() {
    let h = harness(
        FakeDns::new().with_domain(
            "fallback.example",
            DomainDnsRecord {
                a: vec![Ipv4Addr::new(192, 0, 2, 77)],
                ..Default::default()
            },
        ),
        FakeSmtp::new().host("fallback.example", HostBehavior::Rcpt(250)),
    );
    let result = h
        .validator
        .validate_one("carol@fallback.example", &ValidationOptions::default())
        .await;

    assert!(result.is_valid);
    assert_eq!(h.smtp.connects()[0], "fallback.example");
    // accepts random mailboxes too
    assert_eq!(result.checks[&CheckName::CatchAll].score_contribution, -5.0);
}

#[tokio::test]
async fn mx_hosts_are_tried_in_preference_order() {
    let h = harness(
        FakeDns::new().with_domain(
            "multi.example",
            DomainDnsRecord {
                mx: vec![MxRecord::new(20, "backup.multi.example"), MxRecord::new(10, "primary.multi.example")],
                ..Default::default()
            },
        ),
        FakeSmtp::new()
            .host("primary.multi.example", HostBehavior::Refuse)
            .host("backup.multi.example", HostBehavior::Rcpt(250)),
    );
    let result = h
        .validator
        .validate_one("dave@multi.example", &uncached())
        .await;

    assert!(result.is_valid);
    assert_eq!(
        &h.smtp.connects()[..2],
        &["primary.multi.example".to_string(), "backup.multi.example".to_string()]
    );
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let h = healthy();
    let options = ValidationOptions::default();

    let first = h.validator.validate_one("alice@example.com", &options).await;
    let (dns_calls, connects, probe_calls) = (h.dns.calls(), h.smtp.connect_count(), h.probes.calls());
    let second = h.validator.validate_one("Alice@Example.com", &options).await;

    assert_eq!(second.id, first.id);
    assert_eq!(second.score, first.score);
    assert_eq!(second.is_valid, first.is_valid);
    assert_eq!(h.dns.calls(), dns_calls);
    assert_eq!(h.smtp.connect_count(), connects);
    assert_eq!(h.probes.calls(), probe_calls);
}

#[tokio::test]
async fn cache_can_be_bypassed() {
    let h = healthy();
    let first = h.validator.validate_one("alice@example.com", &uncached()).await;
    let connects = h.smtp.connect_count();
    let second = h.validator.validate_one("alice@example.com", &uncached()).await;

    assert_ne!(second.id, first.id);
    assert!(h.smtp.connect_count() > connects);
}

#[tokio::test]
async fn shallow_validation_skips_smtp() {
    let h = healthy();
    let result = h.validator.validate_one("alice@example.com", &shallow()).await;

    assert!(result.is_valid);
    assert!(!result.checks[&CheckName::Smtp].performed);
    assert!(!result.checks[&CheckName::CatchAll].performed);
    assert_eq!(result.score, 90.0);
    assert_eq!(h.smtp.connect_count(), 0);
}

#[tokio::test]
async fn shallow_result_does_not_answer_deep_request() {
    let h = healthy();
    let quick = h.validator.validate_one("alice@example.com", &shallow()).await;
    assert_eq!(h.smtp.connect_count(), 0);

    let deep = h
        .validator
        .validate_one("alice@example.com", &ValidationOptions::default())
        .await;
    assert_ne!(deep.id, quick.id);
    assert!(h.smtp.connect_count() > 0);
    assert!(deep.checks[&CheckName::Smtp].performed);
    assert_eq!(deep.score, 100.0);

    // each depth keeps its own cached answer
    let connects = h.smtp.connect_count();
    let again = h.validator.validate_one("alice@example.com", &shallow()).await;
    assert_eq!(again.id, quick.id);
    let again = h
        .validator
        .validate_one("alice@example.com", &ValidationOptions::default())
        .await;
    assert_eq!(again.id, deep.id);
    assert_eq!(h.smtp.connect_count(), connects);
}

#[tokio::test(start_paused = true)]
async fn batch_keeps_input_order_under_variable_delays() {
    let dns = FakeDns::new()
        .with_healthy_domain("slow.example")
        .with_healthy_domain("medium.example")
        .with_healthy_domain("fast.example")
        .delayed("slow.example", Duration::from_millis(900))
        .delayed("medium.example", Duration::from_millis(300));
    let h = harness(dns, FakeSmtp::new());
    let input = emails(&[
        "a@slow.example",
        "b@fast.example",
        "c@medium.example",
        "not-an-email",
        "d@fast.example",
    ]);

    let batch = h.validator.validate_batch(&input, &shallow()).await.unwrap();

    let order: Vec<&str> = batch.results.iter().map(|r| r.email.as_str()).collect();
    assert_eq!(order, input.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(batch.summary.total, 5);
    assert_eq!(batch.summary.valid, 4);
    assert_eq!(batch.summary.invalid, 1);
    assert_eq!(batch.summary.errors, 0);
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_any_work() {
    let h = healthy();
    let input: Vec<String> = (0..=MAX_BATCH).map(|i| format!("user{i}@example.com")).collect();

    let err = h
        .validator
        .validate_batch(&input, &ValidationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::BatchTooLarge { len: 101, max: 100 }));
    assert_eq!(h.dns.calls(), 0);

    assert!(matches!(
        h.validator.validate_batch(&[], &ValidationOptions::default()).await,
        Err(RequestError::EmptyBatch)
    ));
    assert!(ValidationRequest::new(input, ValidationOptions::default()).is_err());
}

#[tokio::test]
async fn panic_is_contained_to_its_slot() {
    let h = harness(
        FakeDns::new()
            .with_healthy_domain("example.com")
            .panicking("boom.example"),
        FakeSmtp::new(),
    );
    let input = emails(&["alice@example.com", "x@boom.example", "bob@example.com"]);

    let batch = h.validator.validate_batch(&input, &shallow()).await.unwrap();

    let failed = &batch.results[1];
    assert_eq!(failed.email, "x@boom.example");
    assert!(!failed.is_valid);
    assert_eq!(failed.status.as_deref(), Some("Error"));
    assert!(failed.error.as_deref().unwrap_or_default().contains("boom.example"));
    assert!(batch.results[0].is_valid);
    assert!(batch.results[2].is_valid);
    assert_eq!(batch.summary.errors, 1);

    let json = serde_json::to_value(&batch.results[0]).unwrap();
    assert!(json.get("status").is_none());
    let json = serde_json::to_value(failed).unwrap();
    assert_eq!(json["status"], "Error");
}

#[tokio::test(start_paused = true)]
async fn slow_branch_degrades_alone() {
    let mut config = ValidatorConfig::default();
    config.pipeline.fanout_timeout_ms = 1_000;
    let h = harness_with(
        FakeDns::new().with_healthy_domain("example.com"),
        FakeSmtp::new().host("mail.example.com", HostBehavior::Hang),
        config,
    );
    let result = h
        .validator
        .validate_one("alice@example.com", &ValidationOptions::default())
        .await;

    let smtp = &result.checks[&CheckName::Smtp];
    assert!(smtp.error.as_deref().unwrap_or_default().contains("timed out"));
    assert!(result.checks[&CheckName::Reputation].passed);
    // unverified credit, not a rejection
    assert!(result.is_valid);
    assert_eq!(result.score, 90.0);
}

#[tokio::test(start_paused = true)]
async fn slow_catch_all_keeps_smtp_verdict() {
    let mut config = ValidatorConfig::default();
    config.pipeline.fanout_timeout_ms = 1_000;
    // the mailbox check gets through, catch-all attempts hang
    let h = harness_with(
        FakeDns::new().with_healthy_domain("example.com"),
        FakeSmtp::new()
            .host("mail.example.com", HostBehavior::Rcpt(550))
            .recipient("alice@example.com", 250)
            .hang_after(1),
        config,
    );
    let result = h
        .validator
        .validate_one("alice@example.com", &ValidationOptions::default())
        .await;

    let smtp = &result.checks[&CheckName::Smtp];
    assert!(smtp.passed);
    assert!(smtp.error.is_none());
    match &smtp.detail {
        CheckDetail::Smtp(smtp) => assert_eq!(smtp.verdict, SmtpVerdict::Deliverable),
        other => panic!("unexpected smtp detail {other:?}"),
    }
    let catch_all = &result.checks[&CheckName::CatchAll];
    assert!(catch_all.error.as_deref().unwrap_or_default().contains("timed out"));
    assert_eq!(catch_all.score_contribution, 0.0);
    assert!(result.is_valid);
    assert_eq!(result.score, 100.0);
}

#[tokio::test]
async fn disposable_lookup_failure_fails_open() {
    let mut lookup = MockDisposableLookup::new();
    lookup
        .expect_is_disposable()
        .returning(|_| Err(LookupError::Request("connection reset".to_string())));
    let validator = Validator::builder()
        .dns_backend(Arc::new(FakeDns::new().with_healthy_domain("example.com")))
        .smtp_transport(Arc::new(FakeSmtp::new()))
        .reputation_probes(Arc::new(FakeProbes::default()))
        .disposable_lookup(Arc::new(lookup))
        .build()
        .unwrap();

    let result = validator.validate_one("alice@example.com", &shallow()).await;
    let check = &result.checks[&CheckName::Disposable];
    assert!(result.is_valid);
    assert!(check.passed);
    assert!(check.error.is_some());
    match &check.detail {
        CheckDetail::Disposable(verdict) => assert_eq!(verdict.source, VerdictSource::FailOpen),
        other => panic!("unexpected disposable detail {other:?}"),
    }
}

#[tokio::test]
async fn disposable_and_trap_addresses_are_invalid() {
    let h = harness(
        FakeDns::new()
            .with_healthy_domain("mailinator.com")
            .with_healthy_domain("example.com"),
        FakeSmtp::new(),
    );
    let batch = h
        .validator
        .validate_batch(&emails(&["x@mailinator.com", "spamtrap@example.com"]), &shallow())
        .await
        .unwrap();

    assert!(!batch.results[0].is_valid);
    assert!(!batch.results[0].checks[&CheckName::Disposable].passed);
    assert!(!batch.results[1].is_valid);
    assert!(!batch.results[1].checks[&CheckName::SpamTrap].passed);
}

#[tokio::test]
async fn result_store_failure_is_not_fatal() {
    let mut store = MockResultStore::new();
    store
        .expect_store()
        .times(1)
        .returning(|_| Err(StoreError::Unavailable("disk full".to_string())));
    let validator = Validator::builder()
        .dns_backend(Arc::new(FakeDns::new().with_healthy_domain("example.com")))
        .smtp_transport(Arc::new(FakeSmtp::new()))
        .reputation_probes(Arc::new(FakeProbes::default()))
        .result_store(Arc::new(store))
        .build()
        .unwrap();

    let result = validator.validate_one("alice@example.com", &shallow()).await;
    assert!(result.is_valid);
}

/// Reports every counter as far over any limit.
struct SaturatedCache;

#[async_trait]
impl CacheStore for SaturatedCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn increment(&self, _key: &str, _amount: u64, _ttl: Duration) -> CacheResult<u64> {
        Ok(1_000_000)
    }

    async fn ttl(&self, _key: &str) -> CacheResult<Option<Duration>> {
        Ok(None)
    }
}

/// Every operation fails.
struct DownCache;

#[async_trait]
impl CacheStore for DownCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn increment(&self, _key: &str, _amount: u64, _ttl: Duration) -> CacheResult<u64> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn ttl(&self, _key: &str) -> CacheResult<Option<Duration>> {
        Err(CacheError::Connection("refused".to_string()))
    }
}

#[tokio::test]
async fn submit_rejects_rate_limited_clients() {
    let dns = Arc::new(FakeDns::new().with_healthy_domain("example.com"));
    let validator = Validator::builder()
        .dns_backend(dns.clone())
        .smtp_transport(Arc::new(FakeSmtp::new()))
        .reputation_probes(Arc::new(FakeProbes::default()))
        .rate_gate(RateGate::new(Arc::new(SaturatedCache)))
        .build()
        .unwrap();

    let request = ValidationRequest::single("alice@example.com", shallow());
    let err = validator.submit("client-1", Tier::Free, request).await.unwrap_err();
    assert!(matches!(err, RequestError::RateLimited { tier: Tier::Free, .. }));
    assert_eq!(dns.calls(), 0);
}

#[tokio::test]
async fn submit_admits_within_limits() {
    let h = healthy();
    let request = ValidationRequest::new(emails(&["alice@example.com", "bob@example.com"]), shallow()).unwrap();

    let batch = h.validator.submit("client-1", Tier::Basic, request).await.unwrap();
    assert_eq!(batch.summary.total, 2);
}

fn on_down_cache(config: ValidatorConfig, dns: Arc<FakeDns>) -> Validator {
    Validator::builder()
        .config(config)
        .cache(Arc::new(DownCache))
        .dns_backend(dns)
        .smtp_transport(Arc::new(FakeSmtp::new()))
        .reputation_probes(Arc::new(FakeProbes::default()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn unreachable_rate_gate_refuses_requests() {
    let dns = Arc::new(FakeDns::new().with_healthy_domain("example.com"));
    let validator = on_down_cache(ValidatorConfig::default(), dns.clone());

    let request = ValidationRequest::single("alice@example.com", shallow());
    let err = validator.submit("client-1", Tier::Free, request).await.unwrap_err();
    assert!(matches!(err, RequestError::RateGateUnavailable(_)));
    assert!(err.to_string().contains("refused"));
    assert_eq!(dns.calls(), 0);
}

#[tokio::test]
async fn unavailable_cache_degrades_to_uncached_operation_when_failing_open() {
    let mut config = ValidatorConfig::default();
    config.rate_limit.fail_open = true;
    let validator = on_down_cache(config, Arc::new(FakeDns::new().with_healthy_domain("example.com")));

    let request = ValidationRequest::single("alice@example.com", shallow());
    let batch = validator.submit("client-1", Tier::Free, request).await.unwrap();
    assert!(batch.results[0].is_valid);
}

#[tokio::test]
async fn stored_results_can_be_fetched_by_id() {
    let h = healthy();
    let result = h.validator.validate_one("alice@example.com", &shallow()).await;

    let stored = h.validator.results().get(&result.id).await.unwrap();
    assert_eq!(stored.map(|r| r.email), Some("alice@example.com".to_string()));
}

#[test]
fn build_rejects_invalid_config() {
    let mut config = ValidatorConfig::default();
    config.pipeline.max_batch = 0;
    let built = Validator::builder()
        .config(config)
        .dns_backend(Arc::new(FakeDns::new()))
        .smtp_transport(Arc::new(FakeSmtp::new()))
        .reputation_probes(Arc::new(FakeProbes::default()))
        .build();
    assert!(built.is_err());
}
