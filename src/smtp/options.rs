use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs for [`SmtpProber`](super::SmtpProber) and the TCP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpOptions {
    pub helo_domain: String,
    /// Envelope sender; empty sends the null reverse-path `<>`.
    pub mail_from: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    /// Ceiling for a whole conversation with one host.
    pub host_timeout_ms: u64,
    pub max_hosts: usize,
    /// Simultaneous outbound connections across the process.
    pub max_connections: usize,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            helo_domain: "localhost".to_string(),
            mail_from: String::new(),
            port: 25,
            connect_timeout_ms: 10_000,
            command_timeout_ms: 10_000,
            host_timeout_ms: 10_000,
            max_hosts: 5,
            max_connections: 32,
        }
    }
}

impl SmtpOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn host_timeout(&self) -> Duration {
        Duration::from_millis(self.host_timeout_ms)
    }

    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_domain.trim();
        if trimmed.is_empty() { "localhost" } else { trimmed }
    }

    pub fn envelope(&self) -> String {
        format!("MAIL FROM:<{}>", self.mail_from.trim())
    }
}
