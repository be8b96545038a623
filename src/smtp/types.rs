use std::fmt;

use serde::{Deserialize, Serialize};

/// What the mail servers said about the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpVerdict {
    /// `RCPT TO` answered 250.
    Deliverable,
    /// `RCPT TO` answered 550: the mailbox does not exist.
    Rejected,
    /// No host gave a definitive answer.
    Unverified,
}

impl fmt::Display for SmtpVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliverable => f.write_str("deliverable"),
            Self::Rejected => f.write_str("rejected"),
            Self::Unverified => f.write_str("unverified"),
        }
    }
}

/// One host conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttempt {
    pub host: String,
    /// `RCPT TO` reply code, or the code that ended the dialogue early.
    pub code: Option<u16>,
    pub message: Option<String>,
    pub supports_tls: bool,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpResult {
    pub verdict: SmtpVerdict,
    pub valid: bool,
    pub code: Option<u16>,
    pub message: Option<String>,
    pub supports_tls: bool,
    /// Host that produced the verdict.
    pub mx_host: Option<String>,
    pub attempts: Vec<HostAttempt>,
    pub error: Option<String>,
}

impl SmtpResult {
    pub fn tried(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.host.as_str()).collect()
    }

    pub(crate) fn unverified(attempts: Vec<HostAttempt>, error: impl Into<String>) -> Self {
        Self {
            verdict: SmtpVerdict::Unverified,
            valid: false,
            code: None,
            message: None,
            supports_tls: attempts.iter().any(|a| a.supports_tls),
            mx_host: None,
            attempts,
            error: Some(error.into()),
        }
    }
}
