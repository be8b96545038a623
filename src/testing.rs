//! Hand-written backends for unit tests.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::MailAuthStatus;
use crate::cache::{MemoryCache, Memoizer};
use crate::dns::{DnsBackend, DnsError, DnsOptions, DnsResolver, DomainDnsRecord, MxRecord, RecordType};
use crate::reputation::{BlacklistHits, ProbeError, ReputationProbes};
use crate::smtp::{SmtpConversation, SmtpError, SmtpReply, SmtpTransport};

pub(crate) const HEALTHY_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 10);

#[derive(Default)]
pub(crate) struct FakeDns {
    domains: HashMap<String, DomainDnsRecord>,
    txt: HashMap<String, Vec<String>>,
    ptr: HashMap<IpAddr, String>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    pub(crate) calls: AtomicUsize,
}

impl FakeDns {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_domain(mut self, name: &str, mut record: DomainDnsRecord) -> Self {
        record.domain = name.to_string();
        self.domains.insert(name.to_string(), record);
        self
    }

    /// MX `mail.{name}`, one A record with a PTR, one NS.
    pub(crate) fn with_healthy_domain(mut self, name: &str) -> Self {
        self.ptr.insert(IpAddr::V4(HEALTHY_IP), format!("mail.{name}"));
        self.with_domain(
            name,
            DomainDnsRecord {
                mx: vec![MxRecord::new(10, format!("mail.{name}"))],
                a: vec![HEALTHY_IP],
                ns: vec![format!("ns1.{name}")],
                ..Default::default()
            },
        )
    }

    pub(crate) fn with_txt(mut self, name: &str, records: &[&str]) -> Self {
        self.txt
            .insert(name.to_string(), records.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Every lookup for `name` never completes.
    pub(crate) fn hanging(mut self, name: &str) -> Self {
        self.hanging.insert(name.to_string());
        self
    }

    pub(crate) fn panicking(mut self, name: &str) -> Self {
        self.panicking.insert(name.to_string());
        self
    }

    pub(crate) fn delayed(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, name: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(name) {
            panic!("fake DNS asked to panic for {name}");
        }
        if self.hanging.contains(name) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
    }

    fn domain(&self, name: &str) -> Option<&DomainDnsRecord> {
        self.domains.get(name)
    }
}

#[async_trait]
impl DnsBackend for FakeDns {
    async fn mx(&self, name: &str) -> Result<Vec<MxRecord>, DnsError> {
        self.enter(name).await;
        Ok(self.domain(name).map(|d| d.mx.clone()).unwrap_or_default())
    }

    async fn ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        self.enter(name).await;
        Ok(self.domain(name).map(|d| d.a.clone()).unwrap_or_default())
    }

    async fn ipv6(&self, name: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        self.enter(name).await;
        Ok(self.domain(name).map(|d| d.aaaa.clone()).unwrap_or_default())
    }

    async fn ns(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.enter(name).await;
        Ok(self.domain(name).map(|d| d.ns.clone()).unwrap_or_default())
    }

    async fn ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        self.enter(&ip.to_string()).await;
        Ok(self.ptr.get(&ip).cloned().into_iter().collect())
    }

    async fn txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.enter(name).await;
        if name.starts_with("servfail.") {
            return Err(DnsError::lookup(name, RecordType::Txt, "SERVFAIL"));
        }
        Ok(self.txt.get(name).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostBehavior {
    /// Plain dialogue, `RCPT TO` answered with this code.
    Rcpt(u16),
    /// Advertises STARTTLS, then answers `RCPT TO` with `rcpt`.
    StartTls { rcpt: u16 },
    /// Greets with this (negative) code.
    Banner(u16),
    Refuse,
    /// Connection never completes.
    Hang,
}

/// Scriptable SMTP servers keyed by host name.
///
/// Unknown hosts refuse connections. Specific recipients can be given a
/// fixed answer with [`FakeSmtp::recipient`].
#[derive(Default)]
pub(crate) struct FakeSmtp {
    hosts: HashMap<String, HostBehavior>,
    recipients: HashMap<String, u16>,
    hang_after: Option<usize>,
    connects: Mutex<Vec<String>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeSmtp {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn host(mut self, host: &str, behavior: HostBehavior) -> Self {
        self.hosts.insert(host.to_string(), behavior);
        self
    }

    pub(crate) fn recipient(mut self, address: &str, code: u16) -> Self {
        self.recipients.insert(address.to_string(), code);
        self
    }

    /// Every connection after the first `n` hangs, whatever the host.
    pub(crate) fn hang_after(mut self, n: usize) -> Self {
        self.hang_after = Some(n);
        self
    }

    pub(crate) fn connects(&self) -> Vec<String> {
        self.connects.lock().clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl SmtpTransport for FakeSmtp {
    async fn connect(&self, host: &str, _port: u16) -> Result<Box<dyn SmtpConversation>, SmtpError> {
        let attempt = {
            let mut connects = self.connects.lock();
            connects.push(host.to_string());
            connects.len()
        };
        if self.hang_after.is_some_and(|n| attempt > n) {
            std::future::pending::<()>().await;
        }
        let refused = || {
            SmtpError::connect(
                host,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            )
        };
        let behavior = *self.hosts.get(host).ok_or_else(refused)?;
        match behavior {
            HostBehavior::Refuse => Err(refused()),
            HostBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(refused())
            }
            behavior => Ok(Box::new(FakeConversation {
                host: host.to_string(),
                behavior,
                recipients: self.recipients.clone(),
                log: Arc::clone(&self.commands),
                tls: false,
            })),
        }
    }
}

struct FakeConversation {
    host: String,
    behavior: HostBehavior,
    recipients: HashMap<String, u16>,
    log: Arc<Mutex<Vec<String>>>,
    tls: bool,
}

impl FakeConversation {
    fn rcpt_code(&self, command: &str) -> u16 {
        let address = command
            .trim_start_matches("RCPT TO:<")
            .trim_end_matches('>');
        if let Some(code) = self.recipients.get(address) {
            return *code;
        }
        match self.behavior {
            HostBehavior::Rcpt(code) | HostBehavior::StartTls { rcpt: code } => code,
            _ => 550,
        }
    }
}

#[async_trait]
impl SmtpConversation for FakeConversation {
    async fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        match self.behavior {
            HostBehavior::Banner(code) => Ok(SmtpReply::new(code, "go away")),
            _ => Ok(SmtpReply::new(220, format!("{} ESMTP fake", self.host))),
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<SmtpReply, SmtpError> {
        self.log.lock().push(format!("{}: {command}", self.host));
        let verb = command.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        let reply = match verb.as_str() {
            "EHLO" => {
                let mut lines = vec![format!("{} hello", self.host)];
                if matches!(self.behavior, HostBehavior::StartTls { .. }) && !self.tls {
                    lines.push("STARTTLS".to_string());
                }
                SmtpReply { code: 250, lines }
            }
            "HELO" | "MAIL" => SmtpReply::new(250, "OK"),
            "STARTTLS" => SmtpReply::new(220, "ready to start TLS"),
            "RCPT" => {
                let code = self.rcpt_code(command);
                SmtpReply::new(code, if code == 250 { "OK" } else { "mailbox unavailable" })
            }
            "QUIT" => SmtpReply::new(221, "bye"),
            _ => SmtpReply::new(502, "not implemented"),
        };
        Ok(reply)
    }

    async fn upgrade_tls(&mut self, _host: &str) -> Result<(), SmtpError> {
        self.log.lock().push(format!("{}: <tls>", self.host));
        self.tls = true;
        Ok(())
    }
}

pub(crate) fn memo() -> Arc<Memoizer> {
    Arc::new(Memoizer::new(Arc::new(MemoryCache::new())))
}

pub(crate) fn resolver(dns: Arc<FakeDns>) -> DnsResolver {
    DnsResolver::new(dns, memo(), DnsOptions::default())
}

/// Scripted outcome of one reputation probe.
#[derive(Clone)]
pub(crate) enum Script<T> {
    Answer(T),
    Fail,
    Hang,
    Panic,
}

impl<T: Clone> Script<T> {
    async fn run(&self, calls: &AtomicUsize) -> Result<T, ProbeError> {
        calls.fetch_add(1, Ordering::SeqCst);
        match self {
            Script::Answer(value) => Ok(value.clone()),
            Script::Fail => Err(ProbeError::Http("scripted failure".to_string())),
            Script::Hang => std::future::pending().await,
            Script::Panic => panic!("scripted probe panic"),
        }
    }
}

/// Reputation probes answering from scripts. The default is a ten year old,
/// unlisted domain with valid TLS, a website and strict SPF/DMARC.
pub(crate) struct FakeProbes {
    pub(crate) age_days: Script<i64>,
    pub(crate) blacklist: Script<BlacklistHits>,
    pub(crate) tls_valid: Script<bool>,
    pub(crate) web_status: Script<u16>,
    pub(crate) mail_auth: Script<MailAuthStatus>,
    pub(crate) calls: AtomicUsize,
}

impl Default for FakeProbes {
    fn default() -> Self {
        Self {
            age_days: Script::Answer(3650),
            blacklist: Script::Answer(BlacklistHits {
                listed_on: Vec::new(),
                checked: 3,
            }),
            tls_valid: Script::Answer(true),
            web_status: Script::Answer(200),
            mail_auth: Script::Answer(MailAuthStatus::new(
                "example.com",
                true,
                &["v=spf1 -all".to_string()],
                &["v=DMARC1; p=reject".to_string()],
            )),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeProbes {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationProbes for FakeProbes {
    async fn domain_age(&self, _domain: &str) -> Result<i64, ProbeError> {
        self.age_days.run(&self.calls).await
    }

    async fn blacklist_listings(&self, _domain: &str) -> Result<BlacklistHits, ProbeError> {
        self.blacklist.run(&self.calls).await
    }

    async fn certificate(&self, _domain: &str) -> Result<bool, ProbeError> {
        self.tls_valid.run(&self.calls).await
    }

    async fn web_presence(&self, _domain: &str) -> Result<u16, ProbeError> {
        self.web_status.run(&self.calls).await
    }

    async fn mail_auth(&self, _domain: &str) -> Result<MailAuthStatus, ProbeError> {
        self.mail_auth.run(&self.calls).await
    }
}
