//! Syntax checking of email addresses (RFC 5321/5322 subset).
//!
//! [`check_syntax`] is pure: it never touches the network, and the
//! orchestrator stops the pipeline right here when it reports `valid = false`.

mod domain;
mod local;
mod types;

pub use types::{EmailAddress, SyntaxMode, SyntaxReport};

use domain::check_domain;
use local::check_local;

const ADDRESS_MAX: usize = 254;

pub fn check_syntax(email: &str) -> SyntaxReport {
    check_syntax_with_mode(email, SyntaxMode::Strict)
}

pub fn check_syntax_with_mode(email: &str, mode: SyntaxMode) -> SyntaxReport {
    let input = email.trim();
    let mut reasons = Vec::new();

    if input.is_empty() {
        reasons.push("address is empty".to_string());
    } else if input.len() > ADDRESS_MAX {
        reasons.push(format!("total length {} > {ADDRESS_MAX}", input.len()));
    }

    // split on the last '@' so a quoted local part still decomposes
    let Some((local, domain)) = input.rsplit_once('@') else {
        reasons.push("must contain exactly one '@'".to_string());
        return SyntaxReport {
            valid: false,
            reasons,
            local_part: String::new(),
            domain: String::new(),
            ascii_domain: String::new(),
        };
    };
    if local.contains('@') && !(mode == SyntaxMode::Relaxed && local.starts_with('"')) {
        reasons.push("must contain exactly one '@'".to_string());
    }

    check_local(local, mode, &mut reasons);
    let domain = domain.to_lowercase();
    let ascii_domain = check_domain(&domain, &mut reasons).unwrap_or_default();

    SyntaxReport {
        valid: reasons.is_empty(),
        reasons,
        local_part: local.to_string(),
        domain,
        ascii_domain,
    }
}
