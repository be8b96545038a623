use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("trap", r"^(spam)?traps?[0-9]*@"),
    ("honeypot", r"honeypot"),
    ("seed", r"^seed[-_.]?(list|address)?[0-9]*@"),
];

#[derive(Debug, Error)]
pub enum SpamTrapError {
    #[error("spam trap file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("spam trap file {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid spam trap pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl SpamTrapError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Per-category match flags. Every known category is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpamTrapReport {
    pub categories: BTreeMap<String, bool>,
}

impl SpamTrapReport {
    pub fn is_trap(&self) -> bool {
        self.categories.values().any(|hit| *hit)
    }

    pub fn matched(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|(_, hit)| **hit)
            .map(|(category, _)| category.as_str())
    }
}

#[derive(Clone)]
struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    fn compile(source: &str) -> Result<Self, SpamTrapError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|err| SpamTrapError::Pattern {
                pattern: source.to_string(),
                source: err,
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }
}

type PatternSet = BTreeMap<String, Vec<Pattern>>;

/// Regex categories of known spam trap addresses.
///
/// Patterns can be edited at runtime; when the detector was loaded from a
/// file every edit is written back to it.
pub struct SpamTrapDetector {
    path: Option<PathBuf>,
    patterns: RwLock<PatternSet>,
}

impl Default for SpamTrapDetector {
    fn default() -> Self {
        let mut patterns = PatternSet::new();
        for (category, source) in DEFAULT_PATTERNS {
            // built-in patterns are covered by tests
            if let Ok(pattern) = Pattern::compile(source) {
                patterns.entry(category.to_string()).or_default().push(pattern);
            }
        }
        Self {
            path: None,
            patterns: RwLock::new(patterns),
        }
    }
}

impl SpamTrapDetector {
    /// Loads `{category: [pattern]}` from `path`. A missing file falls back to
    /// the built-in patterns; the file is created on the first edit.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SpamTrapError> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "spam trap file not found, using built-in patterns");
                return Ok(Self {
                    path: Some(path),
                    ..Self::default()
                });
            }
            Err(err) => return Err(SpamTrapError::io(&path, err)),
        };
        let config: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&raw).map_err(|source| SpamTrapError::Parse {
                path: path.clone(),
                source,
            })?;

        let mut patterns = PatternSet::new();
        for (category, sources) in config {
            let compiled = sources
                .iter()
                .map(|source| Pattern::compile(source))
                .collect::<Result<Vec<_>, _>>()?;
            patterns.insert(category, compiled);
        }
        info!(path = %path.display(), categories = patterns.len(), "loaded spam trap patterns");
        Ok(Self {
            path: Some(path),
            patterns: RwLock::new(patterns),
        })
    }

    pub fn check(&self, email: &str) -> SpamTrapReport {
        let patterns = self.patterns.read();
        let categories = patterns
            .iter()
            .map(|(category, patterns)| {
                let hit = patterns.iter().any(|p| p.regex.is_match(email));
                if hit {
                    metrics::counter!("mailrisk_spam_trap_hits_total", "category" => category.clone())
                        .increment(1);
                }
                (category.clone(), hit)
            })
            .collect();
        SpamTrapReport { categories }
    }

    pub fn patterns(&self) -> BTreeMap<String, Vec<String>> {
        sources_of(&self.patterns.read())
    }

    /// Returns `false` when the pattern was already present.
    pub fn add_pattern(&self, category: &str, pattern: &str) -> Result<bool, SpamTrapError> {
        let compiled = Pattern::compile(pattern)?;
        let added = self.edit(|patterns| {
            let entry = patterns.entry(category.to_string()).or_default();
            if entry.iter().any(|p| p.source == pattern) {
                return false;
            }
            entry.push(compiled);
            true
        })?;
        if added {
            info!(category, pattern, "added spam trap pattern");
        }
        Ok(added)
    }

    /// Returns `false` when the pattern was not present.
    pub fn remove_pattern(&self, category: &str, pattern: &str) -> Result<bool, SpamTrapError> {
        let removed = self.edit(|patterns| {
            let Some(entry) = patterns.get_mut(category) else {
                return false;
            };
            let before = entry.len();
            entry.retain(|p| p.source != pattern);
            entry.len() != before
        })?;
        if removed {
            info!(category, pattern, "removed spam trap pattern");
        }
        Ok(removed)
    }

    /// Applies `change` to a copy of the set, writes the copy out, then swaps
    /// it in. The write lock is held throughout, so edits are serialised and
    /// a failed write leaves both memory and file untouched.
    fn edit(&self, change: impl FnOnce(&mut PatternSet) -> bool) -> Result<bool, SpamTrapError> {
        let mut patterns = self.patterns.write();
        let mut next = patterns.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        self.persist(&sources_of(&next))?;
        *patterns = next;
        Ok(true)
    }

    fn persist(&self, config: &BTreeMap<String, Vec<String>>) -> Result<(), SpamTrapError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(config).map_err(|source| SpamTrapError::Parse {
            path: path.clone(),
            source,
        })?;
        // one temp file per process; edits inside a process hold the lock
        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", std::process::id()));
        let tmp = PathBuf::from(tmp);
        let written = write_synced(&tmp, &json).and_then(|()| std::fs::rename(&tmp, path));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(SpamTrapError::io(path, err));
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn sources_of(patterns: &PatternSet) -> BTreeMap<String, Vec<String>> {
    patterns
        .iter()
        .map(|(category, patterns)| (category.clone(), patterns.iter().map(|p| p.source.clone()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mailrisk-{name}-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn builtin_patterns_compile() {
        let detector = SpamTrapDetector::default();
        let patterns = detector.patterns();
        assert_eq!(patterns.len(), DEFAULT_PATTERNS.len());
        assert!(patterns.values().all(|p| p.len() == 1));
    }

    #[test]
    fn matches_are_reported_per_category() {
        let detector = SpamTrapDetector::default();

        let report = detector.check("SpamTrap7@example.com");
        assert!(report.is_trap());
        assert_eq!(report.matched().collect::<Vec<_>>(), vec!["trap"]);
        assert_eq!(report.categories.len(), 3);

        let report = detector.check("seed-list@example.com");
        assert_eq!(report.matched().collect::<Vec<_>>(), vec!["seed"]);

        assert!(!detector.check("alice@example.com").is_trap());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let detector = SpamTrapDetector::default();
        let err = detector.add_pattern("broken", "(unclosed").unwrap_err();
        assert!(matches!(err, SpamTrapError::Pattern { .. }));
        assert!(!detector.patterns().contains_key("broken"));
    }

    #[test]
    fn runtime_edits_apply_immediately() {
        let detector = SpamTrapDetector::default();
        assert!(!detector.check("bait@example.com").is_trap());

        assert!(detector.add_pattern("custom", "^bait@").unwrap());
        assert!(!detector.add_pattern("custom", "^bait@").unwrap());
        assert!(detector.check("bait@example.com").categories["custom"]);

        assert!(detector.remove_pattern("custom", "^bait@").unwrap());
        assert!(!detector.remove_pattern("custom", "^bait@").unwrap());
        assert!(!detector.check("bait@example.com").is_trap());
    }

    #[test]
    fn edits_are_persisted_to_file() {
        let path = scratch_file("persist");
        let detector = SpamTrapDetector::from_file(&path).unwrap();
        detector.add_pattern("custom", "^bait@").unwrap();

        let reloaded = SpamTrapDetector::from_file(&path).unwrap();
        assert!(reloaded.check("bait@example.com").categories["custom"]);
        assert!(reloaded.patterns().contains_key("trap"));

        reloaded.remove_pattern("custom", "^bait@").unwrap();
        let again = SpamTrapDetector::from_file(&path).unwrap();
        assert!(again.patterns()["custom"].is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_write_leaves_patterns_unchanged() {
        let path = std::env::temp_dir()
            .join(format!("mailrisk-missing-dir-{}", std::process::id()))
            .join("traps.json");
        let detector = SpamTrapDetector::from_file(&path).unwrap();
        let before = detector.patterns();

        let err = detector.add_pattern("custom", "^bait@").unwrap_err();
        assert!(matches!(err, SpamTrapError::Io { .. }));
        assert_eq!(detector.patterns(), before);
        assert!(!detector.check("bait@example.com").is_trap());

        assert!(detector.remove_pattern("trap", r"^(spam)?traps?[0-9]*@").is_err());
        assert!(detector.check("spamtrap@example.com").is_trap());
    }

    #[test]
    fn concurrent_edits_all_reach_the_file() {
        let path = scratch_file("concurrent");
        let detector = std::sync::Arc::new(SpamTrapDetector::from_file(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let detector = std::sync::Arc::clone(&detector);
                std::thread::spawn(move || detector.add_pattern("custom", &format!("^bait{i}@")).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let reloaded = SpamTrapDetector::from_file(&path).unwrap();
        assert_eq!(reloaded.patterns()["custom"].len(), 8);
        assert_eq!(reloaded.patterns(), detector.patterns());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_replaces_builtin_patterns() {
        let path = scratch_file("replace");
        std::fs::write(&path, r#"{"internal": ["^canary@"]}"#).unwrap();

        let detector = SpamTrapDetector::from_file(&path).unwrap();
        assert_eq!(detector.patterns().keys().collect::<Vec<_>>(), vec!["internal"]);
        assert!(detector.check("Canary@example.com").is_trap());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = scratch_file("malformed");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SpamTrapDetector::from_file(&path),
            Err(SpamTrapError::Parse { .. })
        ));
        let _ = std::fs::remove_file(&path);
    }
}
