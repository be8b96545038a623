use thiserror::Error;

use super::RecordType;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain '{domain}' IDNA conversion failed")]
    MalformedDomain {
        domain: String,
        #[source]
        source: idna::Errors,
    },
    #[error("{record_type} lookup for {name} timed out")]
    Timeout { name: String, record_type: RecordType },
    #[error("{record_type} lookup for {name} failed: {message}")]
    Lookup {
        name: String,
        record_type: RecordType,
        message: String,
    },
    #[error("resolver initialization failed: {message}")]
    ResolverInit { message: String },
}

impl DnsError {
    pub(crate) fn malformed(domain: &str, source: idna::Errors) -> Self {
        Self::MalformedDomain {
            domain: domain.to_string(),
            source,
        }
    }

    pub(crate) fn timeout(name: &str, record_type: RecordType) -> Self {
        Self::Timeout {
            name: name.to_string(),
            record_type,
        }
    }

    pub(crate) fn lookup(name: &str, record_type: RecordType, message: impl ToString) -> Self {
        Self::Lookup {
            name: name.to_string(),
            record_type,
            message: message.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
