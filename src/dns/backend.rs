use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;

use super::{DnsError, MxRecord};

/// Raw record lookups.
///
/// A name without records of the requested type is `Ok(vec![])`, never an
/// error. Errors are reserved for timeouts and resolver failures.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    async fn mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError>;
    async fn ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError>;
    async fn ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>, DnsError>;
    async fn ns(&self, name: &str) -> Result<Vec<String>, DnsError>;
    async fn ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError>;
    async fn txt(&self, name: &str) -> Result<Vec<String>, DnsError>;
}

pub(crate) fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(feature = "with-network")]
pub use self::network::TrustDnsBackend;

#[cfg(feature = "with-network")]
mod network {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use async_trait::async_trait;
    use trust_dns_resolver::{
        TokioAsyncResolver,
        error::{ResolveError, ResolveErrorKind},
    };

    use super::{DnsBackend, normalize_host};
    use crate::dns::{DnsError, MxRecord, RecordType};

    /// [`DnsBackend`] over the system resolver configuration.
    pub struct TrustDnsBackend {
        resolver: TokioAsyncResolver,
    }

    impl TrustDnsBackend {
        pub fn from_system_conf() -> Result<Self, DnsError> {
            let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(|err| {
                DnsError::ResolverInit {
                    message: err.to_string(),
                }
            })?;
            Ok(Self { resolver })
        }
    }

    /// Empty answers are not failures.
    fn classify<T>(name: &str, record_type: RecordType, err: ResolveError) -> Result<Vec<T>, DnsError> {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
            ResolveErrorKind::Timeout => Err(DnsError::timeout(name, record_type)),
            _ => Err(DnsError::lookup(name, record_type, err)),
        }
    }

    #[async_trait]
    impl DnsBackend for TrustDnsBackend {
        async fn mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError> {
            match self.resolver.mx_lookup(name).await {
                Ok(lookup) => Ok(lookup
                    .iter()
                    .map(|mx| MxRecord::new(mx.preference(), normalize_host(&mx.exchange().to_utf8())))
                    .collect()),
                Err(err) => classify(name, RecordType::Mx, err),
            }
        }

        async fn ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
            match self.resolver.ipv4_lookup(name).await {
                Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
                Err(err) => classify(name, RecordType::A, err),
            }
        }

        async fn ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
            match self.resolver.ipv6_lookup(name).await {
                Ok(lookup) => Ok(lookup.iter().map(|aaaa| aaaa.0).collect()),
                Err(err) => classify(name, RecordType::Aaaa, err),
            }
        }

        async fn ns(&self, name: &str) -> Result<Vec<String>, DnsError> {
            match self.resolver.ns_lookup(name).await {
                Ok(lookup) => Ok(lookup.iter().map(|ns| normalize_host(&ns.to_string())).collect()),
                Err(err) => classify(name, RecordType::Ns, err),
            }
        }

        async fn ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
            match self.resolver.reverse_lookup(ip).await {
                Ok(lookup) => Ok(lookup.iter().map(|ptr| normalize_host(&ptr.to_string())).collect()),
                Err(err) => classify(&ip.to_string(), RecordType::Ptr, err),
            }
        }

        async fn txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
            let lookup = match self.resolver.txt_lookup(name).await {
                Ok(lookup) => lookup,
                Err(err) => return classify(name, RecordType::Txt, err),
            };
            let records = lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|piece| String::from_utf8_lossy(piece))
                        .collect::<String>()
                })
                .collect();
            Ok(records)
        }
    }
}
