const LABEL_MAX: usize = 63;

/// IDNA conversion plus hostname label checks.
///
/// Returns the ASCII form when conversion succeeded (even if a label rule
/// failed), so reports can still show what was resolved.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    if domain.is_empty() {
        reasons.push("domain is empty".to_string());
        return None;
    }

    let ascii = match idna::domain_to_ascii(domain) {
        Ok(d) if !d.is_empty() => d,
        Ok(_) => {
            reasons.push("domain empty after IDNA conversion".to_string());
            return None;
        }
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    if !ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    for label in ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > LABEL_MAX {
            reasons.push(format!(
                "domain label '{label}' length {} > {LABEL_MAX}",
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!("domain label '{label}' cannot start/end with '-'"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{label}' has invalid chars"));
        }
    }

    Some(ascii)
}
