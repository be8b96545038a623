const LOCAL_MAX: usize = 64;

/// Checks the local part, pushing one reason per violated rule.
pub(crate) fn check_local(local: &str, mode: super::SyntaxMode, reasons: &mut Vec<String>) {
    if local.is_empty() || local.len() > LOCAL_MAX {
        reasons.push(format!(
            "local part length {} invalid (1..={LOCAL_MAX})",
            local.len()
        ));
        return;
    }

    let ok = match mode {
        super::SyntaxMode::Strict => is_dot_atom(local),
        super::SyntaxMode::Relaxed => is_quoted(local) || is_dot_atom(local),
    };
    if !ok {
        reasons.push(match mode {
            super::SyntaxMode::Strict => "invalid local part (strict rules)".into(),
            super::SyntaxMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }
}

/// atext ASCII + '.', dot neither leading, trailing nor doubled.
fn is_dot_atom(s: &str) -> bool {
    if s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| c.is_ascii_alphanumeric() || is_atext_symbol(c) || c == '.')
}

fn is_atext_symbol(c: char) -> bool {
    matches!(
        c,
        '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '/' | '=' | '?' | '^' | '_' | '`'
            | '{' | '|' | '}' | '~'
    )
}

// quoted-string sans échappement ni guillemet interne
fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && s.starts_with('"')
        && s.ends_with('"')
        && !s[1..s.len() - 1].contains(['"', '\\'])
}
