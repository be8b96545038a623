//! Per-client request admission by subscription tier.

mod gate;
mod tiers;

pub use gate::{RateDecision, RateGate, RateWindow};
pub use tiers::{Granularity, Tier, TierLimits};
