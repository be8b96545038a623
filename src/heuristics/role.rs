use serde::{Deserialize, Serialize};

struct RoleCategory {
    name: &'static str,
    confidence: f64,
    patterns: &'static [&'static str],
}

const CATEGORIES: &[RoleCategory] = &[
    RoleCategory {
        name: "admin",
        confidence: 0.95,
        patterns: &["admin", "administrator", "root", "postmaster", "hostmaster", "webmaster", "sysadmin"],
    },
    RoleCategory {
        name: "support",
        confidence: 0.9,
        patterns: &["support", "help", "helpdesk", "service", "customerservice"],
    },
    RoleCategory {
        name: "sales",
        confidence: 0.85,
        patterns: &["sales", "billing", "accounts", "orders", "invoice"],
    },
    RoleCategory {
        name: "info",
        confidence: 0.85,
        patterns: &["info", "contact", "hello", "office", "enquiries", "inquiries"],
    },
    RoleCategory {
        name: "automated",
        confidence: 0.95,
        patterns: &["noreply", "donotreply", "notifications", "mailer", "bounce"],
    },
    RoleCategory {
        name: "compliance",
        confidence: 0.9,
        patterns: &["abuse", "security", "privacy", "legal", "compliance"],
    },
    RoleCategory {
        name: "hr",
        confidence: 0.8,
        patterns: &["jobs", "careers", "hr", "recruiting"],
    },
    RoleCategory {
        name: "marketing",
        confidence: 0.8,
        patterns: &["marketing", "press", "media", "newsletter", "pr"],
    },
];

const COMMON_NAMES: &[&str] = &[
    "john", "jane", "mike", "david", "sarah", "chris", "alex", "maria", "james", "robert", "linda", "emma",
];

const SUFFIX_FACTOR: f64 = 0.8;
const SUBSTRING_FACTOR: f64 = 0.6;
const LONG_LOCAL: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleVerdict {
    pub is_role: bool,
    pub confidence: f64,
    pub role_type: Option<String>,
}

impl RoleVerdict {
    fn personal() -> Self {
        Self {
            is_role: false,
            confidence: 0.0,
            role_type: None,
        }
    }
}

/// Flags shared mailboxes such as `support@` or `no-reply@`.
///
/// Categories are tried in order; the first pattern that matches the
/// normalised local part decides. A prefix match keeps the category's
/// confidence, a suffix match (patterns of 3+ chars) is scaled by 0.8 and a
/// substring match (4+ chars) by 0.6.
pub fn detect_role(local_part: &str) -> RoleVerdict {
    let normalized: String = local_part
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | '_' | '-'))
        .collect();
    if normalized.is_empty() {
        return RoleVerdict::personal();
    }

    let Some((category, base)) = CATEGORIES.iter().find_map(|category| {
        category
            .patterns
            .iter()
            .find_map(|pattern| match_factor(&normalized, pattern))
            .map(|factor| (category, category.confidence * factor))
    }) else {
        return RoleVerdict::personal();
    };

    let mut confidence = base;
    if normalized.chars().count() > LONG_LOCAL {
        confidence *= 0.7;
    }
    if normalized.chars().any(|c| c.is_ascii_digit()) {
        confidence *= 0.8;
    }
    if COMMON_NAMES.iter().any(|name| normalized.contains(name)) {
        confidence *= 0.5;
    }

    RoleVerdict {
        is_role: true,
        confidence: (confidence * 100.0).round() / 100.0,
        role_type: Some(category.name.to_string()),
    }
}

fn match_factor(local: &str, pattern: &str) -> Option<f64> {
    if local.starts_with(pattern) {
        Some(1.0)
    } else if pattern.len() >= 3 && local.ends_with(pattern) {
        Some(SUFFIX_FACTOR)
    } else if pattern.len() >= 4 && local.contains(pattern) {
        Some(SUBSTRING_FACTOR)
    } else {
        None
    }
}
