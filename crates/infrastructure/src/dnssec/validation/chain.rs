//! The top-level entry points: `validate_root_zone` bootstraps the trust
//! anchor, `validate_chain` walks one domain's zone cuts from the root down
//! and aggregates per-zone evidence into a `ChainReport`.

use crate::dns::client::DnsClient;
use crate::dnssec::trust_anchor::TrustAnchorStore;
use crate::dnssec::types::dnskey;
use crate::dnssec::validation::context::ValidatorContext;
use crate::dnssec::validation::discovery::ZoneDiscoverer;
use crate::dnssec::zone::Zone;
use crate::dnssec::SignatureVerifier;
use chainprobe_domain::{ChainReport, ProbeConfig, ProbeError, ValidationState};
use hickory_proto::rr::RecordType;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

pub struct ChainValidator {
    pub(crate) client: Arc<DnsClient>,
    pub(crate) context: Arc<ValidatorContext>,
    pub(crate) discoverer: ZoneDiscoverer,
    pub(crate) anchors: TrustAnchorStore,
    pub(crate) resolver: IpAddr,
    pub(crate) root_server: IpAddr,
    pub(crate) root: OnceLock<Arc<Zone>>,
}

impl ChainValidator {
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        Self::with_trust_store(config, TrustAnchorStore::new())
    }

    /// Swap the compiled-in anchors out, e.g. to prove that bootstrap fails
    /// closed on a mutated anchor list.
    pub fn with_trust_store(
        config: &ProbeConfig,
        anchors: TrustAnchorStore,
    ) -> Result<Self, ProbeError> {
        let resolver: IpAddr = config
            .resolver
            .parse()
            .map_err(|_| ProbeError::Protocol(format!("bad resolver address: {}", config.resolver)))?;
        let root_server: IpAddr = config.root_server.parse().map_err(|_| {
            ProbeError::Protocol(format!("bad root server address: {}", config.root_server))
        })?;

        let client = Arc::new(DnsClient::new(Duration::from_secs(config.timeout_secs)));
        let context = Arc::new(ValidatorContext::new());
        let discoverer = ZoneDiscoverer::new(client.clone(), context.clone(), resolver);

        Ok(Self {
            client,
            context,
            discoverer,
            anchors,
            resolver,
            root_server,
            root: OnceLock::new(),
        })
    }

    pub fn context(&self) -> &ValidatorContext {
        &self.context
    }

    /// Fetch the root DNSKEY set from the configured root server,
    /// self-validate its RRSIG, and require that at least one key hashes to
    /// a compiled-in anchor. Idempotent; everything else depends on it.
    pub async fn validate_root_zone(&self) -> Result<(), ProbeError> {
        if self.root.get().is_some() {
            return Ok(());
        }

        let dnskey = self
            .client
            .query(".", RecordType::DNSKEY, self.root_server)
            .await?;
        let Some(rrset) = &dnskey.rrset else {
            return Err(ProbeError::MissingResource(". - DNSKEY".into()));
        };
        let keys = dnskey::keys_from_rrset(rrset);

        let self_signed = dnskey
            .rrsig
            .as_ref()
            .map(|sigs| SignatureVerifier::verify_rrsigset(rrset, sigs, ".", &keys))
            .unwrap_or(false);
        if !self_signed {
            return Err(ProbeError::ShouldNotHappen(
                "could not validate root DNSKEY RRSIG".into(),
            ));
        }

        if !self.anchors.authenticates(&keys) {
            return Err(ProbeError::ShouldNotHappen(
                "no root DNSKEY matches a compiled-in trust anchor".into(),
            ));
        }

        info!(
            keys = keys.len(),
            server = %self.root_server,
            "root zone validated against trust anchors"
        );
        let _ = self.root.set(Arc::new(Zone::root(self.root_server, dnskey)));
        Ok(())
    }

    /// Walk the chain of trust for one domain. Never fails: every outcome,
    /// including discovery errors, lands in the returned report.
    pub async fn validate_chain(&self, domain: &str) -> ChainReport {
        let mut report = ChainReport::new(domain);
        if let Err(e) = self.walk_chain(domain, &mut report).await {
            report.mark_error(&e);
        }
        debug!(
            domain = %domain,
            state = %report.validation_state,
            zones = report.zones.len(),
            "chain walk finished"
        );
        report
    }

    async fn walk_chain(&self, domain: &str, report: &mut ChainReport) -> Result<(), ProbeError> {
        let root = self.root.get().cloned().ok_or_else(|| {
            ProbeError::Protocol("root zone not validated, call validate_root_zone first".into())
        })?;

        let mut parent = root;
        for stub in self.discoverer.discover(domain).await? {
            let zone_report = if let Some(cached) = self.context.validated(&stub.name) {
                debug!(zone = %stub.name, "validated-zone cache hit");
                parent = cached.zone;
                cached.report
            } else {
                let (zone, zone_report) = self.validate_zone(&stub, &parent).await;
                if zone_report.is_fully_valid() {
                    self.context.insert_validated(zone.clone(), zone_report.clone());
                }
                parent = zone;
                zone_report
            };

            report.demote(&zone_report);
            let state = zone_report.validation_state;
            report.zones.push(zone_report);

            // A proven-insecure delegation ends the chain of trust; a
            // timeout ends the walk outright (no retries). Other failures
            // demote the report but the remaining zones stay observable.
            if matches!(state, ValidationState::Unsecured | ValidationState::Timeout) {
                break;
            }
        }
        Ok(())
    }
}
