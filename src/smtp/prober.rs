use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{
    HostAttempt, SmtpConversation, SmtpError, SmtpOptions, SmtpReply, SmtpResult, SmtpTransport,
    SmtpVerdict,
};
use crate::dns::MxRecord;

const ACCEPTED: u16 = 250;
const NO_MAILBOX: u16 = 550;

/// Asks mail servers whether they would accept a recipient.
///
/// Hosts are tried in ascending MX preference until one answers `RCPT TO`
/// with 250 or 550. Every other reply, timeout or connection failure moves
/// on to the next host.
pub struct SmtpProber {
    transport: Arc<dyn SmtpTransport>,
    options: SmtpOptions,
    connections: Arc<Semaphore>,
}

impl SmtpProber {
    pub fn new(transport: Arc<dyn SmtpTransport>, options: SmtpOptions) -> Self {
        let connections = Arc::new(Semaphore::new(options.max_connections.max(1)));
        Self {
            transport,
            options,
            connections,
        }
    }

    pub fn options(&self) -> &SmtpOptions {
        &self.options
    }

    /// `email` must already be in wire form (`local@ascii-domain`).
    pub async fn probe(&self, email: &str, hosts: &[MxRecord]) -> SmtpResult {
        let mut ordered = hosts.to_vec();
        ordered.sort();
        ordered.truncate(self.options.max_hosts.max(1));

        if ordered.is_empty() {
            return SmtpResult::unverified(Vec::new(), "No MX servers to verify against");
        }

        let mut attempts = Vec::with_capacity(ordered.len());
        for mx in &ordered {
            let attempt = self.attempt(&mx.exchange, email).await;
            debug!(host = %mx.exchange, code = ?attempt.code, error = ?attempt.error, "SMTP host attempt");

            let verdict = match attempt.code {
                Some(ACCEPTED) => Some(SmtpVerdict::Deliverable),
                Some(NO_MAILBOX) => Some(SmtpVerdict::Rejected),
                _ => None,
            };
            let decided = verdict.map(|verdict| (verdict, attempt.clone()));
            attempts.push(attempt);

            if let Some((verdict, attempt)) = decided {
                return SmtpResult {
                    verdict,
                    valid: verdict == SmtpVerdict::Deliverable,
                    code: attempt.code,
                    message: attempt.message,
                    supports_tls: attempt.supports_tls,
                    mx_host: Some(attempt.host),
                    attempts,
                    error: None,
                };
            }
        }

        warn!(email, tried = attempts.len(), "all MX servers failed verification");
        SmtpResult::unverified(attempts, "All MX servers failed verification")
    }

    async fn attempt(&self, host: &str, email: &str) -> HostAttempt {
        let mut attempt = HostAttempt {
            host: host.to_string(),
            code: None,
            message: None,
            supports_tls: false,
            error: None,
            transcript: Vec::new(),
        };

        let _permit = match self.connections.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                attempt.error = Some(SmtpError::PoolClosed.to_string());
                return attempt;
            }
        };

        let deadline = self.options.host_timeout();
        let outcome = tokio::time::timeout(deadline, self.converse(host, email, &mut attempt)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => attempt.error = Some(err.to_string()),
            Err(_) => attempt.error = Some(SmtpError::timeout(host, "conversation").to_string()),
        }
        attempt
    }

    async fn converse(&self, host: &str, email: &str, attempt: &mut HostAttempt) -> Result<(), SmtpError> {
        let conversation = self.transport.connect(host, self.options.port).await?;
        let mut session = Session::new(host, conversation, &mut attempt.transcript);

        let banner = session.banner().await?;
        if !banner.is_positive_completion() {
            return session.stop(ended_by(&mut attempt.message, &banner)).await;
        }

        let ehlo_cmd = format!("EHLO {}", self.options.helo_name());
        let ehlo = session.command(&ehlo_cmd).await?;
        let esmtp = ehlo.is_positive_completion();
        if !esmtp {
            let helo = session
                .command(&format!("HELO {}", self.options.helo_name()))
                .await?;
            if !helo.is_positive_completion() {
                return session.stop(ended_by(&mut attempt.message, &helo)).await;
            }
        }

        if esmtp && ehlo.has_capability("STARTTLS") {
            attempt.supports_tls = true;
            let reply = session.command("STARTTLS").await?;
            if reply.code == 220 {
                session.upgrade_tls(host).await?;
                // capabilities must be renegotiated over TLS
                let again = session.command(&ehlo_cmd).await?;
                if !again.is_positive_completion() {
                    return session.stop(ended_by(&mut attempt.message, &again)).await;
                }
            }
        }

        let mail = session.command(&self.options.envelope()).await?;
        if !mail.is_positive_completion() {
            return session.stop(ended_by(&mut attempt.message, &mail)).await;
        }

        let rcpt = session.command(&format!("RCPT TO:<{email}>")).await?;
        attempt.code = Some(rcpt.code);
        attempt.message = Some(rcpt.text());
        session.quit().await;
        Ok(())
    }
}

/// Records a reply that ended the dialogue before `RCPT TO`. The code is
/// kept as message only, so it can never be mistaken for a verdict.
fn ended_by(message: &mut Option<String>, reply: &SmtpReply) -> String {
    let text = format!("{} {}", reply.code, reply.text()).trim_end().to_string();
    *message = Some(text.clone());
    text
}

/// Conversation wrapper keeping a transcript, one line per direction.
struct Session<'t> {
    host: String,
    conversation: Box<dyn SmtpConversation>,
    transcript: &'t mut Vec<String>,
}

impl<'t> Session<'t> {
    fn new(host: &str, conversation: Box<dyn SmtpConversation>, transcript: &'t mut Vec<String>) -> Self {
        Self {
            host: host.to_string(),
            conversation,
            transcript,
        }
    }

    fn record(&mut self, direction: &str, message: &str) {
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    fn record_reply(&mut self, reply: &SmtpReply) {
        for line in &reply.lines {
            self.record("S", format!("{} {line}", reply.code).trim_end());
        }
    }

    async fn banner(&mut self) -> Result<SmtpReply, SmtpError> {
        let reply = self.conversation.read_reply().await?;
        self.record_reply(&reply);
        Ok(reply)
    }

    async fn command(&mut self, command: &str) -> Result<SmtpReply, SmtpError> {
        self.record("C", command);
        let reply = self.conversation.send_command(command).await?;
        self.record_reply(&reply);
        Ok(reply)
    }

    async fn upgrade_tls(&mut self, host: &str) -> Result<(), SmtpError> {
        self.conversation.upgrade_tls(host).await?;
        self.record("*", "TLS established");
        Ok(())
    }

    async fn quit(&mut self) {
        self.record("C", "QUIT");
        // the verdict is already known, a failed QUIT changes nothing
        let _ = self.conversation.send_command("QUIT").await;
    }

    async fn stop(mut self, reason: String) -> Result<(), SmtpError> {
        self.quit().await;
        Err(SmtpError::Protocol(format!("dialogue ended early: {reason}")))
    }
}
