use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Mx,
    A,
    Aaaa,
    Ns,
    Ptr,
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mx => "mx",
            Self::A => "a",
            Self::Aaaa => "aaaa",
            Self::Ns => "ns",
            Self::Ptr => "ptr",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Everything the pipeline needs to know about a domain's DNS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDnsRecord {
    /// ASCII (punycode) domain that was queried.
    pub domain: String,
    /// Ascending preference.
    pub mx: Vec<MxRecord>,
    pub a: Vec<Ipv4Addr>,
    pub aaaa: Vec<Ipv6Addr>,
    pub ns: Vec<String>,
    /// Reverse name of the first A address.
    pub ptr: Option<String>,
}

impl DomainDnsRecord {
    pub fn has_mx(&self) -> bool {
        !self.mx.is_empty()
    }

    pub fn has_address(&self) -> bool {
        !self.a.is_empty() || !self.aaaa.is_empty()
    }

    pub fn has_ptr(&self) -> bool {
        self.ptr.is_some()
    }

    /// True when some host would accept mail for the domain.
    pub fn is_mail_capable(&self) -> bool {
        self.has_mx() || self.has_address()
    }

    /// MX hosts, or the implicit MX (the domain itself) when only
    /// address records exist (RFC 5321 §5.1).
    pub fn mail_hosts(&self) -> Vec<MxRecord> {
        if self.has_mx() {
            self.mx.clone()
        } else if self.has_address() {
            vec![MxRecord::new(0, self.domain.clone())]
        } else {
            Vec::new()
        }
    }
}

/// A record type whose lookup failed; the record is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub record_type: RecordType,
    pub timed_out: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsReport {
    pub record: DomainDnsRecord,
    pub failures: Vec<LookupFailure>,
}

impl DnsReport {
    pub fn timed_out(&self) -> bool {
        self.failures.iter().any(|failure| failure.timed_out)
    }

    /// MX state could not be established.
    pub fn mx_unknown(&self) -> bool {
        self.failures
            .iter()
            .any(|failure| failure.record_type == RecordType::Mx)
    }
}
