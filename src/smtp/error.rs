use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} with {host} timed out")]
    Timeout { host: String, stage: &'static str },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("TLS handshake with {host} failed: {message}")]
    Tls { host: String, message: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("connection pool closed")]
    PoolClosed,
}

impl SmtpError {
    pub(crate) fn connect(host: &str, source: std::io::Error) -> Self {
        Self::Connect {
            host: host.to_string(),
            source,
        }
    }

    pub(crate) fn timeout(host: &str, stage: &'static str) -> Self {
        Self::Timeout {
            host: host.to_string(),
            stage,
        }
    }

    pub(crate) fn tls(host: &str, message: impl ToString) -> Self {
        Self::Tls {
            host: host.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}
