use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{
    DnsBackend, DnsError, DnsOptions, DnsReport, DomainDnsRecord, LookupFailure, MxRecord,
    RecordType,
};
use crate::cache::Memoizer;

/// Caching, deadline-bounded front for a [`DnsBackend`].
///
/// Answers are cached per `(name, record type)` under `dns:{name}:{type}`.
/// Failed lookups are never cached.
pub struct DnsResolver {
    backend: Arc<dyn DnsBackend>,
    memo: Arc<Memoizer>,
    options: DnsOptions,
}

impl DnsResolver {
    pub fn new(backend: Arc<dyn DnsBackend>, memo: Arc<Memoizer>, options: DnsOptions) -> Self {
        Self {
            backend,
            memo,
            options,
        }
    }

    /// Full domain picture: MX, A, AAAA and NS concurrently, then PTR of the
    /// first A address.
    ///
    /// Only a malformed domain is an error. A record type whose lookup timed
    /// out or failed is reported in [`DnsReport::failures`] and left empty.
    pub async fn resolve(&self, domain: &str) -> Result<DnsReport, DnsError> {
        let ascii = encode_domain(domain)?;
        let mut failures = Vec::new();

        let (mx, a, aaaa, ns) = tokio::join!(
            self.mx_records(&ascii),
            self.ipv4_addrs(&ascii),
            self.ipv6_addrs(&ascii),
            self.ns_records(&ascii),
        );
        let mx = settle(mx, RecordType::Mx, &mut failures);
        let a = settle(a, RecordType::A, &mut failures);
        let aaaa = settle(aaaa, RecordType::Aaaa, &mut failures);
        let ns = settle(ns, RecordType::Ns, &mut failures);

        let ptr = match a.first() {
            Some(ip) => settle(self.ptr_names(IpAddr::V4(*ip)).await, RecordType::Ptr, &mut failures)
                .into_iter()
                .next(),
            None => None,
        };

        if !failures.is_empty() {
            warn!(domain = %ascii, ?failures, "partial DNS resolution");
        }

        Ok(DnsReport {
            record: DomainDnsRecord {
                domain: ascii,
                mx,
                a,
                aaaa,
                ns,
                ptr,
            },
            failures,
        })
    }

    /// MX records in ascending preference, deduplicated.
    pub async fn mx_records(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        let ascii = encode_domain(domain)?;
        self.cached(&ascii, RecordType::Mx, || async {
            let mut records = self.backend.mx(&ascii).await?;
            records.sort();
            records.dedup();
            Ok(records)
        })
        .await
    }

    pub async fn ipv4_addrs(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        self.cached(name, RecordType::A, || self.backend.ipv4(name)).await
    }

    pub async fn ipv6_addrs(&self, name: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        self.cached(name, RecordType::Aaaa, || self.backend.ipv6(name)).await
    }

    pub async fn ns_records(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.cached(name, RecordType::Ns, || self.backend.ns(name)).await
    }

    pub async fn ptr_names(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        self.cached(&ip.to_string(), RecordType::Ptr, || self.backend.ptr(ip))
            .await
    }

    pub async fn txt_records(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.cached(name, RecordType::Txt, || self.backend.txt(name)).await
    }

    async fn cached<T, F, Fut>(&self, name: &str, record_type: RecordType, lookup: F) -> Result<T, DnsError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DnsError>>,
    {
        let key = format!("dns:{name}:{}", record_type.as_str());
        let deadline = self.options.timeout();
        self.memo
            .get_or_compute(&key, self.options.cache_ttl(), || async move {
                debug!(name, %record_type, "DNS query");
                tokio::time::timeout(deadline, lookup())
                    .await
                    .map_err(|_| DnsError::timeout(name, record_type))?
            })
            .await
    }
}

/// Trim, reject empty, IDNA to ASCII, lowercase without trailing dot.
pub fn encode_domain(domain: &str) -> Result<String, DnsError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DnsError::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(|err| DnsError::malformed(trimmed, err))
}

fn settle<T: Default>(result: Result<T, DnsError>, record_type: RecordType, failures: &mut Vec<LookupFailure>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            failures.push(LookupFailure {
                record_type,
                timed_out: err.is_timeout(),
                message: err.to_string(),
            });
            T::default()
        }
    }
}
