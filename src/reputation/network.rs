use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use super::{BlacklistHits, ProbeError, ReputationOptions, ReputationProbes};
use crate::auth::{MailAuthStatus, check_mail_auth};
use crate::dns::DnsResolver;

#[derive(Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: Option<String>,
}

/// Probes backed by RDAP, DNSBL queries, a TLS handshake and HTTPS.
pub struct NetworkProbes {
    http: reqwest::Client,
    tls: TlsConnector,
    resolver: Arc<DnsResolver>,
    options: ReputationOptions,
}

impl NetworkProbes {
    pub fn new(resolver: Arc<DnsResolver>, options: ReputationOptions) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder()
            .timeout(options.factor_timeout())
            .user_agent(concat!("mailrisk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProbeError::http)?;
        Ok(Self {
            http,
            tls: TlsConnector::from(crate::tls::client_config()),
            resolver,
            options,
        })
    }
}

#[async_trait]
impl ReputationProbes for NetworkProbes {
    async fn domain_age(&self, domain: &str) -> Result<i64, ProbeError> {
        let url = format!("{}{domain}", self.options.rdap_url);
        let response = self.http.get(&url).send().await.map_err(ProbeError::http)?;
        if !response.status().is_success() {
            return Err(ProbeError::Registration(format!("RDAP returned HTTP {}", response.status())));
        }
        let body: RdapDomain = response.json().await.map_err(ProbeError::http)?;
        let registered = body
            .events
            .iter()
            .find(|event| event.action == "registration")
            .and_then(|event| event.date.as_deref())
            .ok_or_else(|| ProbeError::Registration("no registration event".to_string()))?;
        let registered = DateTime::parse_from_rfc3339(registered)
            .map_err(|err| ProbeError::Registration(err.to_string()))?;
        Ok((Utc::now() - registered.with_timezone(&Utc)).num_days())
    }

    async fn blacklist_listings(&self, domain: &str) -> Result<BlacklistHits, ProbeError> {
        let queries = self.options.blacklist_zones.iter().map(|zone| async move {
            let name = format!("{domain}.{zone}");
            (zone, self.resolver.ipv4_addrs(&name).await)
        });

        let mut hits = BlacklistHits::default();
        let mut last_error = None;
        for (zone, answer) in join_all(queries).await {
            match answer {
                Ok(addrs) => {
                    hits.checked += 1;
                    if !addrs.is_empty() {
                        hits.listed_on.push(zone.clone());
                    }
                }
                Err(err) => {
                    debug!(%zone, error = %err, "DNSBL query failed");
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) if hits.checked == 0 => Err(err.into()),
            _ => Ok(hits),
        }
    }

    async fn certificate(&self, domain: &str) -> Result<bool, ProbeError> {
        let server_name =
            rustls::ServerName::try_from(domain).map_err(|err| ProbeError::Tls(err.to_string()))?;
        let stream = TcpStream::connect((domain, 443))
            .await
            .map_err(|err| ProbeError::Tls(err.to_string()))?;
        match self.tls.connect(server_name, stream).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                debug!(domain, error = %err, "certificate rejected");
                Ok(false)
            }
            Err(err) => Err(ProbeError::Tls(err.to_string())),
        }
    }

    async fn web_presence(&self, domain: &str) -> Result<u16, ProbeError> {
        let response = self
            .http
            .get(format!("https://{domain}/"))
            .send()
            .await
            .map_err(ProbeError::http)?;
        Ok(response.status().as_u16())
    }

    async fn mail_auth(&self, domain: &str) -> Result<MailAuthStatus, ProbeError> {
        Ok(check_mail_auth(&self.resolver, domain).await?)
    }
}
