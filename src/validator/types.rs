use serde::{Deserialize, Serialize};

/// How permissive the local-part grammar is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxMode {
    /// Dot-atom only (RFC 5322 atext).
    #[default]
    Strict,
    /// Also accepts a simple quoted string as local part.
    Relaxed,
}

/// Outcome of [`check_syntax`](super::check_syntax).
///
/// The address is decomposed even when invalid, so callers can still report
/// which domain was targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxReport {
    pub valid: bool,
    pub reasons: Vec<String>,
    pub local_part: String,
    /// Domain as written, lowercased.
    pub domain: String,
    /// IDNA (punycode) form of `domain`; empty when conversion failed.
    pub ascii_domain: String,
}

impl SyntaxReport {
    pub fn address(&self) -> Option<EmailAddress> {
        if !self.valid {
            return None;
        }
        Some(EmailAddress {
            local_part: self.local_part.clone(),
            domain: self.domain.clone(),
            ascii_domain: self.ascii_domain.clone(),
        })
    }
}

/// A syntactically valid address split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    pub local_part: String,
    pub domain: String,
    pub ascii_domain: String,
}

impl EmailAddress {
    /// `local@ascii_domain`, the form sent on the wire.
    pub fn to_ascii(&self) -> String {
        format!("{}@{}", self.local_part, self.ascii_domain)
    }
}
