//! Per-zone validation: everything the prober can learn about one
//! (child, parent) pair. Nameserver resolution, DS and DNSKEY fetches, the
//! signature checks, key-role counts, and the DS/DNSKEY match.

use crate::dns::dissector::{Dissector, SignedRrset};
use crate::dnssec::denial::{DenialProof, DenialProver};
use crate::dnssec::types::{count_key_roles, dnskey, ds, DnskeyRecord};
use crate::dnssec::validation::chain::ChainValidator;
use crate::dnssec::zone::Zone;
use crate::dnssec::SignatureVerifier;
use chainprobe_domain::{ProbeError, ZoneReport};
use hickory_proto::rr::{RData, RecordType};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

impl ChainValidator {
    /// Validate one child zone against its (already processed) parent.
    /// Infallible by design: any probe error is folded into the report, and
    /// the zone is returned as far as it was populated so descendants can
    /// still use it as a parent.
    pub(crate) async fn validate_zone(
        &self,
        stub: &Zone,
        parent: &Zone,
    ) -> (Arc<Zone>, ZoneReport) {
        let mut zone = Zone {
            name: stub.name.clone(),
            ns: None,
            soa: stub.soa.clone(),
            dnskey: None,
        };
        let mut report = ZoneReport::new(zone.name.clone());

        if let Err(e) = self.probe_zone(&mut zone, parent, &mut report).await {
            warn!(zone = %zone.name, error = %e, "zone validation failed");
            report.mark_error(&e);
        }

        (Arc::new(zone), report)
    }

    async fn probe_zone(
        &self,
        zone: &mut Zone,
        parent: &Zone,
        report: &mut ZoneReport,
    ) -> Result<(), ProbeError> {
        // 1. Authoritative server: A record of the SOA MNAME, resolved
        //    through the recursive resolver.
        let mname = zone
            .soa_mname()
            .ok_or_else(|| ProbeError::MissingResource(format!("{} - SOA", zone.name)))?;
        let ns_answer = self
            .client
            .query(&mname, RecordType::A, self.resolver)
            .await?;
        let ns_addr = ns_answer
            .rrset
            .as_ref()
            .and_then(first_a_address)
            .ok_or_else(|| ProbeError::MissingResource(format!("{} - NS A record", zone.name)))?;
        zone.ns = Some(ns_addr);

        // 2. DS at the parent's authoritative server; absence must be proven.
        let (ds_set, proof) = self.query_ds(zone, parent).await?;

        // 3. DNSKEY at the child's own authoritative server.
        let dnskey_set = self
            .client
            .query(&zone.name, RecordType::DNSKEY, ns_addr)
            .await?;

        report.has_dnskey = dnskey_set.rrset.is_some();
        report.has_ds = ds_set.is_some();

        let keys: Vec<DnskeyRecord> = dnskey_set
            .rrset
            .as_ref()
            .map(dnskey::keys_from_rrset)
            .unwrap_or_default();

        if report.has_dnskey {
            // self-signature: the DNSKEY RRset under its own keys
            report.valid_dnskey = SignatureVerifier::verify_signed(&dnskey_set, &zone.name, &keys);
            let (num_ksk, num_zsk) = count_key_roles(&keys);
            report.num_ksk = num_ksk;
            report.num_zsk = num_zsk;
        }

        if let Some(ds_set) = &ds_set {
            let parent_keys = parent.dnskey_records();
            if !parent_keys.is_empty() {
                report.valid_ds = SignatureVerifier::verify_signed(ds_set, &parent.name, &parent_keys);
            }
        }

        if let Some(soa) = &zone.soa {
            report.valid_soa = SignatureVerifier::verify_signed(soa, &zone.name, &keys);
        }

        if report.has_ds && report.has_dnskey {
            if let Some(ds_rrset) = ds_set.as_ref().and_then(|signed| signed.rrset.as_ref()) {
                let ds_records = ds::records_from_rrset(ds_rrset);
                report.validated = ds_matches_any(&zone.name, &keys, &ds_records);
            }
        }

        zone.dnskey = Some(dnskey_set);

        if !report.has_ds {
            if let Some(proof) = proof {
                report.mark_unsecured(proof.as_str());
            }
        }

        Ok(())
    }

    /// DS lookup against the parent's nameserver. Exactly one half of the
    /// result is populated: the signed DS set, or the denial proof that
    /// converted its absence into a proven insecure delegation.
    pub(crate) async fn query_ds(
        &self,
        zone: &Zone,
        parent: &Zone,
    ) -> Result<(Option<SignedRrset>, Option<DenialProof>), ProbeError> {
        if let Some(proof) = self.context.insecure_proof(&zone.name) {
            debug!(zone = %zone.name, proof = %proof, "insecure-delegation cache hit");
            return Ok((None, Some(proof)));
        }

        let parent_ns = parent
            .ns
            .ok_or_else(|| ProbeError::MissingResource(format!("{} - NS", parent.name)))?;
        let response = self
            .client
            .raw_query(&zone.name, RecordType::DS, parent_ns)
            .await?;

        let ds_set = Dissector::signed_rrset(&response, RecordType::DS);
        if ds_set.rrset.is_some() {
            return Ok((Some(ds_set), None));
        }

        let proof = DenialProver::prove(&zone.name, parent, &response)?;
        self.context.mark_insecure(zone.name.clone(), proof);
        debug!(zone = %zone.name, proof = %proof, "delegation proven insecure");
        Ok((None, Some(proof)))
    }
}

/// The chain link itself: some DNSKEY, hashed under some DS's digest
/// algorithm, equals that DS. The whole key set takes part, since some zones,
/// nonconformingly, point their parent DS at a ZSK. Empty sets yield
/// `false`, never an error.
pub(crate) fn ds_matches_any(
    zone: &str,
    keys: &[DnskeyRecord],
    ds_records: &[crate::dnssec::types::DsRecord],
) -> bool {
    for ds in ds_records {
        for key in keys {
            match SignatureVerifier::make_ds(zone, key, ds.digest_type) {
                Ok(computed) if computed == *ds => return true,
                _ => {}
            }
        }
    }
    false
}

fn first_a_address(rrset: &crate::dns::dissector::Rrset) -> Option<IpAddr> {
    rrset.records.iter().find_map(|record| match record.data() {
        RData::A(a) => Some(IpAddr::V4(a.0)),
        _ => None,
    })
}
