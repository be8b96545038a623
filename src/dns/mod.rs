//! DNS resolution for the validation pipeline.
//!
//! [`DnsBackend`] is the raw lookup capability; [`DnsResolver`] adds IDN
//! encoding, per-query deadlines and caching on top of it.

mod backend;
mod error;
mod options;
mod resolver;
mod types;

#[cfg(feature = "with-network")]
pub use backend::TrustDnsBackend;
pub use backend::DnsBackend;
pub(crate) use backend::normalize_host;
pub use error::DnsError;
pub use options::DnsOptions;
pub use resolver::{DnsResolver, encode_domain};
pub use types::{DnsReport, DomainDnsRecord, LookupFailure, MxRecord, RecordType};

#[cfg(test)]
mod tests;
