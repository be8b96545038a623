use std::sync::Arc;

use super::{BuildError, Inner, Validator};
use crate::cache::{CacheStore, MemoryCache, Memoizer};
use crate::config::ValidatorConfig;
use crate::disposable::{DisposableDetector, DisposableLookup};
use crate::dns::{DnsBackend, DnsResolver};
use crate::heuristics::{CatchAllDetector, SpamTrapDetector, TypoDetector};
use crate::rate_limit::RateGate;
use crate::reputation::{ReputationChecker, ReputationProbes};
use crate::results::{MemoryResultStore, ResultStore};
use crate::scoring::RiskScorer;
use crate::smtp::{SmtpProber, SmtpTransport};

/// Wires a [`Validator`] from its capabilities.
///
/// Cache and result store default to process memory. With the
/// `with-network` feature the DNS backend, SMTP transport and reputation
/// probes default to the real network implementations; without it they
/// must be supplied.
#[derive(Default)]
pub struct ValidatorBuilder {
    config: ValidatorConfig,
    cache: Option<Arc<dyn CacheStore>>,
    dns: Option<Arc<dyn DnsBackend>>,
    smtp: Option<Arc<dyn SmtpTransport>>,
    probes: Option<Arc<dyn ReputationProbes>>,
    disposable: Option<Arc<dyn DisposableLookup>>,
    results: Option<Arc<dyn ResultStore>>,
    spam_traps: Option<Arc<SpamTrapDetector>>,
    gate: Option<RateGate>,
}

impl ValidatorBuilder {
    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn dns_backend(mut self, backend: Arc<dyn DnsBackend>) -> Self {
        self.dns = Some(backend);
        self
    }

    pub fn smtp_transport(mut self, transport: Arc<dyn SmtpTransport>) -> Self {
        self.smtp = Some(transport);
        self
    }

    pub fn reputation_probes(mut self, probes: Arc<dyn ReputationProbes>) -> Self {
        self.probes = Some(probes);
        self
    }

    pub fn disposable_lookup(mut self, lookup: Arc<dyn DisposableLookup>) -> Self {
        self.disposable = Some(lookup);
        self
    }

    pub fn result_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.results = Some(store);
        self
    }

    pub fn spam_traps(mut self, detector: Arc<SpamTrapDetector>) -> Self {
        self.spam_traps = Some(detector);
        self
    }

    /// Defaults to a gate counting in the validator's cache.
    pub fn rate_gate(mut self, gate: RateGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> Result<Validator, BuildError> {
        let config = self.config;
        config.validate()?;

        let cache = self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new()));
        let memo = Arc::new(Memoizer::new(Arc::clone(&cache)));

        let dns_backend = match self.dns {
            Some(backend) => backend,
            None => default_dns()?,
        };
        let dns = Arc::new(DnsResolver::new(dns_backend, Arc::clone(&memo), config.dns.clone()));

        let transport = match self.smtp {
            Some(transport) => transport,
            None => default_smtp(&config)?,
        };
        let prober = Arc::new(SmtpProber::new(transport, config.smtp.clone()));

        let probes = match self.probes {
            Some(probes) => probes,
            None => default_probes(&dns, &config)?,
        };

        let disposable_lookup = match self.disposable {
            Some(lookup) => Some(lookup),
            None => default_disposable(&config)?,
        };

        let spam_traps = match self.spam_traps {
            Some(detector) => detector,
            None => Arc::new(match &config.spam_trap_file {
                Some(path) => {
                    SpamTrapDetector::from_file(path).map_err(|err| BuildError::init("spam trap detector", err))?
                }
                None => SpamTrapDetector::default(),
            }),
        };

        let inner = Inner {
            catch_all: CatchAllDetector::new(Arc::clone(&prober), config.pipeline.catch_all_probes),
            disposable: DisposableDetector::new(&config.disposable, disposable_lookup),
            reputation: ReputationChecker::new(probes, Arc::clone(&memo), config.reputation.clone()),
            typo: TypoDetector::default(),
            scorer: RiskScorer::new(config.scoring.clone()),
            results: self.results.unwrap_or_else(|| Arc::new(MemoryResultStore::new())),
            gate: self.gate.unwrap_or_else(|| RateGate::new(Arc::clone(&cache))),
            spam_traps,
            memo,
            dns,
            prober,
            rate_limit: config.rate_limit,
            pipeline: config.pipeline,
        };
        Ok(Validator {
            inner: Arc::new(inner),
        })
    }
}

#[cfg(feature = "with-network")]
fn default_dns() -> Result<Arc<dyn DnsBackend>, BuildError> {
    let backend = crate::dns::TrustDnsBackend::from_system_conf().map_err(|err| BuildError::init("DNS resolver", err))?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "with-network"))]
fn default_dns() -> Result<Arc<dyn DnsBackend>, BuildError> {
    Err(BuildError::Missing("DNS backend"))
}

#[cfg(feature = "with-network")]
fn default_smtp(config: &ValidatorConfig) -> Result<Arc<dyn SmtpTransport>, BuildError> {
    Ok(Arc::new(crate::smtp::TcpSmtpTransport::new(&config.smtp)))
}

#[cfg(not(feature = "with-network"))]
fn default_smtp(_config: &ValidatorConfig) -> Result<Arc<dyn SmtpTransport>, BuildError> {
    Err(BuildError::Missing("SMTP transport"))
}

#[cfg(feature = "with-network")]
fn default_probes(dns: &Arc<DnsResolver>, config: &ValidatorConfig) -> Result<Arc<dyn ReputationProbes>, BuildError> {
    let probes = crate::reputation::NetworkProbes::new(Arc::clone(dns), config.reputation.clone())
        .map_err(|err| BuildError::init("reputation probes", err))?;
    Ok(Arc::new(probes))
}

#[cfg(not(feature = "with-network"))]
fn default_probes(_dns: &Arc<DnsResolver>, _config: &ValidatorConfig) -> Result<Arc<dyn ReputationProbes>, BuildError> {
    Err(BuildError::Missing("reputation probe set"))
}

#[cfg(feature = "with-network")]
fn default_disposable(config: &ValidatorConfig) -> Result<Option<Arc<dyn DisposableLookup>>, BuildError> {
    let lookup = crate::disposable::HttpDisposableLookup::from_options(&config.disposable)
        .map_err(|err| BuildError::init("disposable lookup", err))?;
    Ok(lookup.map(|lookup| Arc::new(lookup) as Arc<dyn DisposableLookup>))
}

#[cfg(not(feature = "with-network"))]
fn default_disposable(_config: &ValidatorConfig) -> Result<Option<Arc<dyn DisposableLookup>>, BuildError> {
    Ok(None)
}
