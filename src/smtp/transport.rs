use async_trait::async_trait;

use super::{SmtpError, SmtpReply};

/// Opens SMTP connections. The core never touches sockets directly.
#[async_trait]
pub trait SmtpTransport: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn SmtpConversation>, SmtpError>;
}

/// One open SMTP connection.
#[async_trait]
pub trait SmtpConversation: Send {
    async fn read_reply(&mut self) -> Result<SmtpReply, SmtpError>;

    async fn send_command(&mut self, command: &str) -> Result<SmtpReply, SmtpError>;

    /// Runs the TLS handshake after a positive STARTTLS reply.
    async fn upgrade_tls(&mut self, host: &str) -> Result<(), SmtpError>;
}
