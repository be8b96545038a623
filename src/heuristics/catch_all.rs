use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dns::MxRecord;
use crate::smtp::SmtpProber;

const LOCAL_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const LOCAL_LEN: usize = 10;
pub const DEFAULT_PROBES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchAllReport {
    pub is_catch_all: bool,
    pub confidence: f64,
    /// One code per probe that got a reply.
    pub responses: Vec<u16>,
    pub error: Option<String>,
}

/// Probes a domain with random mailboxes that cannot exist.
///
/// A server accepting all of them accepts anything, so a positive SMTP
/// verdict for the real address says little.
pub struct CatchAllDetector {
    prober: Arc<SmtpProber>,
    probes: usize,
}

impl CatchAllDetector {
    pub fn new(prober: Arc<SmtpProber>, probes: usize) -> Self {
        Self {
            prober,
            probes: probes.max(1),
        }
    }

    pub async fn detect(&self, ascii_domain: &str, hosts: &[MxRecord]) -> CatchAllReport {
        let addresses: Vec<String> = {
            let mut rng = rand::thread_rng();
            (0..self.probes)
                .map(|_| format!("{}@{ascii_domain}", random_local(&mut rng)))
                .collect()
        };

        let mut responses = Vec::with_capacity(addresses.len());
        let mut last_error = None;
        for address in &addresses {
            let result = self.prober.probe(address, hosts).await;
            match result.code.or_else(|| result.attempts.last().and_then(|a| a.code)) {
                Some(code) => responses.push(code),
                None => last_error = result.error,
            }
        }

        let is_catch_all = !responses.is_empty() && responses.iter().all(|code| *code == 250);
        debug!(domain = ascii_domain, ?responses, is_catch_all, "catch-all probe");
        CatchAllReport {
            is_catch_all,
            confidence: calculate_confidence(&responses),
            error: if responses.is_empty() { last_error } else { None },
            responses,
        }
    }
}

fn random_local(rng: &mut impl Rng) -> String {
    (0..LOCAL_LEN)
        .map(|_| LOCAL_CHARSET[rng.gen_range(0..LOCAL_CHARSET.len())] as char)
        .collect()
}

/// Share of the most frequent code: 1.0 when all agree, 0.0 without replies.
pub fn calculate_confidence(codes: &[u16]) -> f64 {
    if codes.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<u16, usize> = HashMap::new();
    for code in codes {
        *counts.entry(*code).or_default() += 1;
    }
    let dominant = counts.values().copied().max().unwrap_or(0);
    dominant as f64 / codes.len() as f64
}
