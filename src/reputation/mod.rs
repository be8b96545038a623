//! Domain reputation: five weighted factors measured concurrently.

mod checker;
#[cfg(feature = "with-network")]
mod network;
mod options;
mod probes;
mod types;

pub use checker::ReputationChecker;
#[cfg(feature = "with-network")]
pub use network::NetworkProbes;
pub use options::ReputationOptions;
pub use probes::{ProbeError, ReputationProbes};
pub use types::{BlacklistHits, Factor, FactorDetail, FactorReport, ReputationReport};
