//! The four process-wide caches shared by every worker.
//!
//! All entries are additive and written at most once per key. The
//! check-then-insert race between concurrent workers is accepted: duplicated
//! discovery wastes a few queries, but the values derive from authoritative
//! DNS content and are equal modulo signature freshness.

use crate::dnssec::denial::DenialProof;
use crate::dnssec::zone::Zone;
use chainprobe_domain::ZoneReport;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

/// A fully validated zone together with the evidence that validated it.
#[derive(Debug, Clone)]
pub struct ValidatedZone {
    pub zone: Arc<Zone>,
    pub report: ZoneReport,
}

#[derive(Debug, Default)]
pub struct ValidatorContext {
    /// Zones whose SOA owner matched the zone name exactly.
    existing_zones: DashMap<String, Arc<Zone>>,
    /// Candidate names whose SOA owner did not match.
    nonexisting_zones: DashSet<String>,
    /// Zones that validated fully, reusable as parents.
    validated_zones: DashMap<String, ValidatedZone>,
    /// Zones whose missing DS was proven by NSEC/NSEC3.
    insecure_delegations: DashMap<String, DenialProof>,
}

impl ValidatorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing(&self, name: &str) -> Option<Arc<Zone>> {
        self.existing_zones.get(name).map(|entry| entry.clone())
    }

    pub fn is_nonexisting(&self, name: &str) -> bool {
        self.nonexisting_zones.contains(name)
    }

    /// Record a zone whose existence was just proven. First writer wins.
    pub fn mark_existing(&self, zone: Arc<Zone>) {
        self.existing_zones.entry(zone.name.clone()).or_insert(zone);
    }

    pub fn mark_nonexisting(&self, name: String) {
        self.nonexisting_zones.insert(name);
    }

    pub fn validated(&self, name: &str) -> Option<ValidatedZone> {
        self.validated_zones.get(name).map(|entry| entry.clone())
    }

    pub fn insert_validated(&self, zone: Arc<Zone>, report: ZoneReport) {
        self.validated_zones
            .entry(zone.name.clone())
            .or_insert(ValidatedZone { zone, report });
    }

    pub fn insecure_proof(&self, name: &str) -> Option<DenialProof> {
        self.insecure_delegations.get(name).map(|entry| *entry)
    }

    pub fn mark_insecure(&self, name: String, proof: DenialProof) {
        self.insecure_delegations.entry(name).or_insert(proof);
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            existing_zones: self.existing_zones.len(),
            nonexisting_zones: self.nonexisting_zones.len(),
            validated_zones: self.validated_zones.len(),
            insecure_delegations: self.insecure_delegations.len(),
        }
    }
}

/// Entry counts for the end-of-run summary.
#[derive(Debug, Clone, Copy)]
pub struct ContextStats {
    pub existing_zones: usize,
    pub nonexisting_zones: usize,
    pub validated_zones: usize,
    pub insecure_delegations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::dissector::SignedRrset;

    fn stub(name: &str) -> Arc<Zone> {
        Arc::new(Zone::stub(name, SignedRrset::default()))
    }

    #[test]
    fn test_existing_round_trip() {
        let context = ValidatorContext::new();
        assert!(context.existing("com.").is_none());
        context.mark_existing(stub("com."));
        assert_eq!(context.existing("com.").unwrap().name, "com.");
        assert!(!context.is_nonexisting("com."));
    }

    #[test]
    fn test_first_writer_wins() {
        let context = ValidatorContext::new();
        let first = stub("org.");
        context.mark_existing(first.clone());
        context.mark_existing(stub("org."));
        assert!(Arc::ptr_eq(&context.existing("org.").unwrap(), &first));
    }

    #[test]
    fn test_validated_and_insecure_caches() {
        let context = ValidatorContext::new();
        let zone = stub("example.com.");
        context.insert_validated(zone.clone(), ZoneReport::new("example.com."));
        assert!(context.validated("example.com.").is_some());
        assert!(context.validated("other.com.").is_none());

        context.mark_insecure("unsigned.com.".to_string(), DenialProof::Nsec3);
        assert_eq!(
            context.insecure_proof("unsigned.com."),
            Some(DenialProof::Nsec3)
        );

        let stats = context.stats();
        assert_eq!(stats.validated_zones, 1);
        assert_eq!(stats.insecure_delegations, 1);
    }

    #[test]
    fn test_nonexisting_is_separate_from_existing() {
        let context = ValidatorContext::new();
        context.mark_nonexisting("www.example.com.".to_string());
        assert!(context.is_nonexisting("www.example.com."));
        assert!(context.existing("www.example.com.").is_none());
    }
}
