use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use super::{DnsError, DnsOptions, DnsResolver, DomainDnsRecord, MxRecord, RecordType, encode_domain};
use crate::cache::{MemoryCache, Memoizer};
use crate::testing::FakeDns;

fn resolver(dns: Arc<FakeDns>) -> DnsResolver {
    DnsResolver::new(
        dns,
        Arc::new(Memoizer::new(Arc::new(MemoryCache::new()))),
        DnsOptions::default(),
    )
}

#[test]
fn encode_domain_rejects_empty() {
    let err = encode_domain("  ").expect_err("empty domain should fail");
    assert!(matches!(err, DnsError::EmptyDomain));
}

#[test]
fn encode_domain_handles_idn_and_trailing_dot() {
    assert_eq!(encode_domain("Exämple.COM.").unwrap(), "xn--exmple-cua.com");
}

#[tokio::test]
async fn mx_records_sorted_and_deduped() {
    let dns = Arc::new(FakeDns::new().with_domain(
        "example.com",
        DomainDnsRecord {
            mx: vec![
                MxRecord::new(20, "mx2.example.com"),
                MxRecord::new(10, "mx1.example.com"),
                MxRecord::new(10, "mx1.example.com"),
            ],
            ..Default::default()
        },
    ));
    let records = resolver(dns).mx_records("example.com").await.unwrap();
    assert_eq!(
        records,
        vec![MxRecord::new(10, "mx1.example.com"), MxRecord::new(20, "mx2.example.com")]
    );
}

#[tokio::test]
async fn resolve_collects_every_record_type() {
    let dns = Arc::new(FakeDns::new().with_healthy_domain("example.com"));
    let report = resolver(dns).resolve("example.com").await.unwrap();

    assert!(report.failures.is_empty());
    let record = report.record;
    assert!(record.has_mx());
    assert_eq!(record.a, vec![Ipv4Addr::new(192, 0, 2, 10)]);
    assert_eq!(record.ptr.as_deref(), Some("mail.example.com"));
    assert!(record.is_mail_capable());
}

#[tokio::test]
async fn unknown_domain_is_empty_not_error() {
    let dns = Arc::new(FakeDns::new());
    let report = resolver(dns).resolve("nothing.example").await.unwrap();
    assert!(report.failures.is_empty());
    assert!(!report.record.is_mail_capable());
    assert!(report.record.mail_hosts().is_empty());
}

#[tokio::test]
async fn second_resolution_is_served_from_cache() {
    let dns = Arc::new(FakeDns::new().with_healthy_domain("example.com"));
    let resolver = resolver(Arc::clone(&dns));

    let first = resolver.resolve("example.com").await.unwrap();
    let calls = dns.calls();
    assert!(calls > 0);

    let second = resolver.resolve("example.com").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(dns.calls(), calls, "second resolve must not hit the backend");
}

#[tokio::test(start_paused = true)]
async fn hanging_lookup_times_out_and_is_not_cached() {
    let dns = Arc::new(FakeDns::new().hanging("slow.example"));
    let resolver = resolver(Arc::clone(&dns));

    let report = resolver.resolve("slow.example").await.unwrap();
    assert!(report.timed_out());
    assert!(report.mx_unknown());
    assert_eq!(report.failures.len(), 4);
    assert!(report.failures.iter().all(|f| f.timed_out));

    let before = dns.calls();
    let err = resolver.mx_records("slow.example").await.unwrap_err();
    assert!(matches!(err, DnsError::Timeout { record_type: RecordType::Mx, .. }));
    assert_eq!(dns.calls(), before + 1);
}

#[tokio::test]
async fn implicit_mx_when_only_address_records() {
    let dns = Arc::new(FakeDns::new().with_domain(
        "bare.example",
        DomainDnsRecord {
            a: vec![Ipv4Addr::new(192, 0, 2, 1)],
            ..Default::default()
        },
    ));
    let report = resolver(dns).resolve("bare.example").await.unwrap();
    assert_eq!(report.record.mail_hosts(), vec![MxRecord::new(0, "bare.example")]);
}

#[tokio::test]
async fn malformed_domain_is_an_error() {
    let dns = Arc::new(FakeDns::new());
    let err = resolver(Arc::clone(&dns)).resolve("").await.unwrap_err();
    assert!(matches!(err, DnsError::EmptyDomain));
    assert_eq!(dns.calls(), 0);
}

#[test]
fn options_accessors() {
    let options = DnsOptions::default();
    assert_eq!(options.timeout(), Duration::from_secs(3));
    assert_eq!(options.cache_ttl(), Duration::from_secs(3600));
}
