use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{AuthStrength, has_prefix_ignore_case};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DmarcStatus {
    Missing,
    MultipleRecords { records: Vec<String> },
    Invalid { record: String, issue: DmarcIssue },
    Weak { record: String, policy: DmarcPolicy },
    Compliant { record: String, policy: DmarcPolicy },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmarcIssue {
    InvalidVersion,
    MissingPolicy,
    UnknownPolicy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmarcPolicy {
    None,
    Quarantine,
    Reject,
}

impl DmarcStatus {
    pub fn strength(&self) -> AuthStrength {
        match self {
            Self::Compliant { .. } => AuthStrength::Enforced,
            Self::Weak { .. } => AuthStrength::Weak,
            Self::Missing | Self::MultipleRecords { .. } | Self::Invalid { .. } => AuthStrength::Absent,
        }
    }
}

/// Classifies the TXT records published at `_dmarc.<domain>`.
///
/// `p=reject` is compliant; `quarantine` and `none` only monitor or soften.
pub(crate) fn evaluate(records: &[String]) -> DmarcStatus {
    let mut dmarc: Vec<&str> = records
        .iter()
        .map(|record| record.trim())
        .filter(|record| has_prefix_ignore_case(record, "v=dmarc1"))
        .collect();

    match dmarc.len() {
        0 => return DmarcStatus::Missing,
        1 => {}
        _ => {
            dmarc.sort_unstable();
            dmarc.dedup();
            return DmarcStatus::MultipleRecords {
                records: dmarc.into_iter().map(str::to_string).collect(),
            };
        }
    }

    let record = dmarc[0].to_string();
    let tags = parse_tags(&record);

    if !tags.get("v").is_some_and(|v| v.eq_ignore_ascii_case("dmarc1")) {
        return DmarcStatus::Invalid {
            record,
            issue: DmarcIssue::InvalidVersion,
        };
    }
    let Some(policy) = tags.get("p") else {
        return DmarcStatus::Invalid {
            record,
            issue: DmarcIssue::MissingPolicy,
        };
    };

    match policy.to_ascii_lowercase().as_str() {
        "reject" => DmarcStatus::Compliant {
            record,
            policy: DmarcPolicy::Reject,
        },
        "quarantine" => DmarcStatus::Weak {
            record,
            policy: DmarcPolicy::Quarantine,
        },
        "none" => DmarcStatus::Weak {
            record,
            policy: DmarcPolicy::None,
        },
        other => DmarcStatus::Invalid {
            issue: DmarcIssue::UnknownPolicy(other.to_string()),
            record,
        },
    }
}

fn parse_tags(record: &str) -> HashMap<String, String> {
    record
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            Some((key.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}
