use serde::{Deserialize, Serialize};
use textdistance::str::damerau_levenshtein;
use tracing::debug;

pub const DEFAULT_PROVIDERS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "aol.com",
    "icloud.com",
    "mail.com",
    "gmx.com",
    "protonmail.com",
    "zoho.com",
];

const MIN_SIMILARITY: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypoSuggestion {
    pub suggestion: String,
    pub message: String,
    pub similarity: f64,
}

/// Suggests a well-known provider domain for likely misspellings.
pub struct TypoDetector {
    providers: Vec<String>,
}

impl Default for TypoDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDERS.iter().map(|p| p.to_string()))
    }
}

impl TypoDetector {
    pub fn new(providers: impl IntoIterator<Item = String>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| p.to_ascii_lowercase()).collect(),
        }
    }

    /// Best provider at similarity >= 0.8, unless the domain already is one.
    pub fn detect(&self, domain: &str) -> Option<TypoSuggestion> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() || self.providers.iter().any(|p| *p == domain) {
            return None;
        }

        let (best, similarity) = self
            .providers
            .iter()
            .map(|provider| (provider, similarity(&domain, provider)))
            .filter(|(_, score)| *score >= MIN_SIMILARITY)
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        debug!(domain, suggestion = %best, similarity, "possible domain typo");
        Some(TypoSuggestion {
            suggestion: best.clone(),
            message: format!("Did you mean '@{best}'?"),
            similarity: (similarity * 100.0).round() / 100.0,
        })
    }
}

/// `1 - distance / longest`, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - damerau_levenshtein(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_closest_provider() {
        let hit = TypoDetector::default().detect("gmial.com").expect("typo detected");
        assert_eq!(hit.suggestion, "gmail.com");
        insta::assert_snapshot!(hit.message, @"Did you mean '@gmail.com'?");
        assert!(hit.similarity >= 0.8);
    }

    #[test]
    fn exact_provider_is_not_a_typo() {
        assert_eq!(TypoDetector::default().detect("Gmail.com"), None);
    }

    #[test]
    fn unrelated_domain_is_ignored() {
        assert_eq!(TypoDetector::default().detect("example.org"), None);
    }

    #[test]
    fn transposition_counts_once() {
        // "yaoho.com" vs "yahoo.com": one transposition over 9 chars
        let score = similarity("yaoho.com", "yahoo.com");
        assert!((score - (1.0 - 1.0 / 9.0)).abs() < 1e-9);
    }
}
