//! Address-level heuristics that need no network, plus catch-all probing.

mod catch_all;
mod role;
mod spam_trap;
mod typo;

pub use catch_all::{CatchAllDetector, CatchAllReport, DEFAULT_PROBES, calculate_confidence};
pub use role::{RoleVerdict, detect_role};
pub use spam_trap::{SpamTrapDetector, SpamTrapError, SpamTrapReport};
pub use typo::{DEFAULT_PROVIDERS, TypoDetector, TypoSuggestion, similarity};
