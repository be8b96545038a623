//! Mailbox probing over SMTP.
//!
//! [`SmtpProber`] owns the dialogue and its classification; the socket work
//! sits behind [`SmtpTransport`] so it can be swapped out.

mod error;
mod options;
mod prober;
mod reply;
#[cfg(feature = "with-network")]
mod session;
mod transport;
mod types;

pub use error::SmtpError;
pub use options::SmtpOptions;
pub use prober::SmtpProber;
pub use reply::SmtpReply;
#[cfg(feature = "with-network")]
pub use session::TcpSmtpTransport;
pub use transport::{SmtpConversation, SmtpTransport};
pub use types::{HostAttempt, SmtpResult, SmtpVerdict};
