use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream};

use super::reply::ReplyParser;
use super::{SmtpConversation, SmtpError, SmtpOptions, SmtpReply, SmtpTransport};

/// Plain TCP transport with opportunistic STARTTLS (rustls).
pub struct TcpSmtpTransport {
    connect_timeout: Duration,
    command_timeout: Duration,
    tls: TlsConnector,
}

impl TcpSmtpTransport {
    pub fn new(options: &SmtpOptions) -> Self {
        Self {
            connect_timeout: options.connect_timeout(),
            command_timeout: options.command_timeout(),
            tls: TlsConnector::from(crate::tls::client_config()),
        }
    }
}

#[async_trait]
impl SmtpTransport for TcpSmtpTransport {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn SmtpConversation>, SmtpError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SmtpError::timeout(host, "connect"))?
            .map_err(|err| SmtpError::connect(host, err))?;

        Ok(Box::new(TcpConversation {
            host: host.to_string(),
            state: StreamState::Plain(stream),
            buffer: Vec::new(),
            command_timeout: self.command_timeout,
            tls: self.tls.clone(),
        }))
    }
}

enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Invalid,
}

struct TcpConversation {
    host: String,
    state: StreamState,
    buffer: Vec<u8>,
    command_timeout: Duration,
    tls: TlsConnector,
}

impl TcpConversation {
    async fn write_line(&mut self, command: &str) -> Result<(), SmtpError> {
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        match &mut self.state {
            StreamState::Plain(stream) => {
                stream.write_all(&data).await.map_err(SmtpError::io)?;
                stream.flush().await.map_err(SmtpError::io)
            }
            StreamState::Tls(stream) => {
                stream.write_all(&data).await.map_err(SmtpError::io)?;
                stream.flush().await.map_err(SmtpError::io)
            }
            StreamState::Invalid => Err(SmtpError::Protocol("invalid stream state".into())),
        }
    }

    async fn read_line(&mut self) -> Result<String, SmtpError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| SmtpError::Protocol(format!("utf8 error: {err}")));
            }

            let mut chunk = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut chunk).await,
                StreamState::Tls(stream) => stream.read(&mut chunk).await,
                StreamState::Invalid => {
                    return Err(SmtpError::Protocol("invalid stream state".into()));
                }
            };
            let read = read.map_err(SmtpError::io)?;
            if read == 0 {
                return Err(SmtpError::io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    async fn read_reply_inner(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut parser = ReplyParser::default();
        loop {
            let line = self.read_line().await?;
            if let Some(reply) = parser.push_line(&line)? {
                return Ok(reply);
            }
        }
    }
}

#[async_trait]
impl SmtpConversation for TcpConversation {
    async fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let deadline = self.command_timeout;
        let host = self.host.clone();
        tokio::time::timeout(deadline, self.read_reply_inner())
            .await
            .map_err(|_| SmtpError::timeout(&host, "reply"))?
    }

    async fn send_command(&mut self, command: &str) -> Result<SmtpReply, SmtpError> {
        self.write_line(command).await?;
        self.read_reply().await
    }

    async fn upgrade_tls(&mut self, host: &str) -> Result<(), SmtpError> {
        let plain = match std::mem::replace(&mut self.state, StreamState::Invalid) {
            StreamState::Plain(stream) => stream,
            tls @ StreamState::Tls(_) => {
                self.state = tls;
                return Ok(());
            }
            StreamState::Invalid => return Err(SmtpError::Protocol("invalid stream state".into())),
        };

        let server_name =
            rustls::ServerName::try_from(host).map_err(|err| SmtpError::tls(host, err))?;
        let handshake = self.tls.connect(server_name, plain);
        let stream = tokio::time::timeout(self.command_timeout, handshake)
            .await
            .map_err(|_| SmtpError::timeout(host, "TLS handshake"))?
            .map_err(|err| SmtpError::tls(host, err))?;

        self.buffer.clear();
        self.state = StreamState::Tls(Box::new(stream));
        Ok(())
    }
}
