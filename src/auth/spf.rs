use serde::{Deserialize, Serialize};

use super::{AuthStrength, has_prefix_ignore_case};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpfStatus {
    Missing,
    MultipleRecords { records: Vec<String> },
    Invalid { record: String, issue: SpfIssue },
    Delegated { record: String, target: String },
    Weak { record: String, qualifier: SpfQualifier },
    Compliant { record: String, qualifier: SpfQualifier },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpfIssue {
    InvalidVersion,
    MissingAllMechanism,
}

/// Qualifier of the terminal `all` mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpfQualifier {
    Fail,
    SoftFail,
    Neutral,
    Pass,
}

impl SpfStatus {
    pub fn strength(&self) -> AuthStrength {
        match self {
            Self::Compliant { .. } | Self::Delegated { .. } => AuthStrength::Enforced,
            Self::Weak { .. } => AuthStrength::Weak,
            Self::Missing | Self::MultipleRecords { .. } | Self::Invalid { .. } => AuthStrength::Absent,
        }
    }
}

/// Classifies the TXT records published at the domain apex.
pub(crate) fn evaluate(records: &[String]) -> SpfStatus {
    let mut spf: Vec<&str> = records
        .iter()
        .map(|record| record.trim())
        .filter(|record| has_prefix_ignore_case(record, "v=spf1"))
        .collect();

    match spf.len() {
        0 => return SpfStatus::Missing,
        1 => {}
        _ => {
            spf.sort_unstable();
            spf.dedup();
            return SpfStatus::MultipleRecords {
                records: spf.into_iter().map(str::to_string).collect(),
            };
        }
    }

    let record = spf[0].to_string();
    let mut terms = record.split_whitespace();
    // "v=spf1x" passes the prefix filter but is not a version term
    if !terms.next().is_some_and(|v| v.eq_ignore_ascii_case("v=spf1")) {
        return SpfStatus::Invalid {
            record,
            issue: SpfIssue::InvalidVersion,
        };
    }

    let mut qualifier = None;
    let mut redirect = None;
    for term in terms {
        let lower = term.to_ascii_lowercase();
        qualifier = qualifier.or_else(|| all_qualifier(&lower));
        if redirect.is_none() {
            redirect = lower
                .strip_prefix("redirect=")
                .filter(|target| !target.is_empty())
                .map(|_| term["redirect=".len()..].to_string());
        }
    }

    match (qualifier, redirect) {
        (Some(q @ (SpfQualifier::Fail | SpfQualifier::SoftFail)), _) => SpfStatus::Compliant {
            record,
            qualifier: q,
        },
        (Some(q), _) => SpfStatus::Weak {
            record,
            qualifier: q,
        },
        (None, Some(target)) => SpfStatus::Delegated { record, target },
        (None, None) => SpfStatus::Invalid {
            record,
            issue: SpfIssue::MissingAllMechanism,
        },
    }
}

fn all_qualifier(term: &str) -> Option<SpfQualifier> {
    match term {
        "-all" => Some(SpfQualifier::Fail),
        "~all" => Some(SpfQualifier::SoftFail),
        "?all" => Some(SpfQualifier::Neutral),
        "all" | "+all" => Some(SpfQualifier::Pass),
        _ => None,
    }
}
