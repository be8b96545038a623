use serde::{Deserialize, Serialize};

use super::SmtpError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// EHLO keyword lookup, first token of each line.
    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .map(|token| token.eq_ignore_ascii_case(cap))
                .unwrap_or(false)
        })
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// Accumulates reply lines (`250-...` continuations, `250 ...` last).
#[derive(Debug, Default)]
pub(crate) struct ReplyParser {
    code: Option<u16>,
    lines: Vec<String>,
}

impl ReplyParser {
    /// Feeds one line without its CRLF. Returns the reply once the final
    /// line has been seen.
    pub(crate) fn push_line(&mut self, line: &str) -> Result<Option<SmtpReply>, SmtpError> {
        let code = line
            .get(..3)
            .and_then(|digits| digits.parse::<u16>().ok())
            .ok_or_else(|| SmtpError::Protocol(format!("invalid reply line: {line}")))?;

        match self.code {
            Some(existing) if existing != code => {
                return Err(SmtpError::Protocol(format!(
                    "inconsistent reply codes: {existing} vs {code}"
                )));
            }
            Some(_) => {}
            None => self.code = Some(code),
        }

        let is_last = line.as_bytes().get(3) != Some(&b'-');
        self.lines.push(line.get(4..).unwrap_or("").to_string());

        if is_last {
            let lines = std::mem::take(&mut self.lines);
            self.code = None;
            Ok(Some(SmtpReply { code, lines }))
        } else {
            Ok(None)
        }
    }
}
