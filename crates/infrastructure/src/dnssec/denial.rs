//! Authenticated denial of existence: deciding whether a DS-less response
//! *proves* the delegation is insecure.
//!
//! A bare "no DS in the answer" is worthless: anyone on the path can strip
//! records. Only an NSEC3 (or legacy NSEC) record that covers the child
//! name, validates under the parent's keys, and omits DS from its type
//! bitmap converts absence into a proven insecure delegation.

use crate::dns::dissector::{Dissector, Rrset};
use crate::dns::names;
use crate::dnssec::crypto::SignatureVerifier;
use crate::dnssec::zone::Zone;
use chainprobe_domain::ProbeError;
use hickory_proto::dnssec::rdata::DNSSECRData;
use hickory_proto::op::Message;
use hickory_proto::rr::{Name, RData, RecordType};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Which mechanism delivered the denial proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialProof {
    Nsec,
    Nsec3,
}

impl DenialProof {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nsec => "NSEC",
            Self::Nsec3 => "NSEC3",
        }
    }
}

impl fmt::Display for DenialProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DenialProver;

impl DenialProver {
    /// Decide whether `response`, a DS query answer whose DS RRset was
    /// absent, cryptographically denies DS existence for `child`.
    ///
    /// NSEC3 records are tried first; plain NSEC is the nonconforming
    /// fallback some zones still serve. A record whose signature does not
    /// verify under the parent's keys is skipped. A covering record that
    /// *lists* DS contradicts the response it arrived in and is escalated.
    pub fn prove(
        child: &str,
        parent: &Zone,
        response: &Message,
    ) -> Result<DenialProof, ProbeError> {
        let parent_keys = parent.dnskey_records();

        let nsec3_sets = Dissector::all_rrsets(response, RecordType::NSEC3, None);
        let nsec3_sigs =
            Dissector::all_rrsets(response, RecordType::RRSIG, Some(RecordType::NSEC3));

        if !nsec3_sigs.is_empty() {
            for set in &nsec3_sets {
                let Some(sigs) = nsec3_sigs.iter().find(|s| s.name == set.name) else {
                    continue;
                };
                if !SignatureVerifier::verify_rrsigset(set, sigs, &parent.name, &parent_keys) {
                    debug!(owner = %set.name, "NSEC3 signature did not verify, skipping record");
                    continue;
                }
                if Self::nsec3_names_child(child, set)? {
                    return Ok(DenialProof::Nsec3);
                }
            }
            return Err(ProbeError::MissingResource(format!(
                "{} - DS (no verified NSEC3 denial matches)",
                child
            )));
        }

        let nsec_sets = Dissector::all_rrsets(response, RecordType::NSEC, None);
        let nsec_sigs = Dissector::all_rrsets(response, RecordType::RRSIG, Some(RecordType::NSEC));

        for set in &nsec_sets {
            let Some(sigs) = nsec_sigs.iter().find(|s| s.name == set.name) else {
                continue;
            };
            if !SignatureVerifier::verify_rrsigset(set, sigs, &parent.name, &parent_keys) {
                debug!(owner = %set.name, "NSEC signature did not verify, skipping record");
                continue;
            }
            if Self::nsec_names_child(child, set)? {
                return Ok(DenialProof::Nsec);
            }
        }

        Err(ProbeError::MissingResource(format!(
            "{} - DS (no verified denial of existence)",
            child
        )))
    }

    /// The NSEC3 *directly names* the child when the hash of the child under
    /// the record's own parameters equals the leading owner label. Only then
    /// may its bitmap speak for the DS type.
    fn nsec3_names_child(child: &str, set: &Rrset) -> Result<bool, ProbeError> {
        for record in &set.records {
            let RData::DNSSEC(DNSSECRData::NSEC3(nsec3)) = record.data() else {
                continue;
            };

            let hashed = SignatureVerifier::nsec3_hash(
                child,
                nsec3.salt(),
                nsec3.iterations(),
                nsec3.hash_algorithm(),
            )?;

            let Some(owner_label) = names::first_label(&set.name) else {
                continue;
            };
            if owner_label.to_ascii_uppercase() != hashed {
                continue;
            }

            if nsec3.type_bit_maps().contains(&RecordType::DS) {
                // The record that should deny DS claims DS exists.
                return Err(ProbeError::ShouldNotHappen(
                    "NSEC3 proved existence of DS record".into(),
                ));
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Legacy NSEC names the child literally: owner equals the child name
    /// and the bitmap omits DS.
    fn nsec_names_child(child: &str, set: &Rrset) -> Result<bool, ProbeError> {
        let child_name = Name::from_str(child)
            .map_err(|e| ProbeError::Protocol(format!("invalid child name {}: {}", child, e)))?;
        if set.name != child_name {
            return Ok(false);
        }

        for record in &set.records {
            let RData::DNSSEC(DNSSECRData::NSEC(nsec)) = record.data() else {
                continue;
            };
            if nsec.type_bit_maps().contains(&RecordType::DS) {
                return Err(ProbeError::ShouldNotHappen(
                    "NSEC proved existence of DS record".into(),
                ));
            }
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::dnssec::rdata::{DNSSECRData, NSEC, NSEC3};
    use hickory_proto::dnssec::Nsec3HashAlgorithm;
    use hickory_proto::op::{MessageType, OpCode};
    use hickory_proto::rr::Record;

    const SALT: &[u8] = &[0xAA, 0xBB, 0xCC, 0xDD];
    const ITERATIONS: u16 = 5;

    fn nsec3_rrset(owner: &str, types: Vec<RecordType>) -> Rrset {
        let name = Name::from_str(owner).unwrap();
        let nsec3 = NSEC3::new(
            Nsec3HashAlgorithm::SHA1,
            false,
            ITERATIONS,
            SALT.to_vec(),
            vec![0u8; 20],
            types,
        );
        let record = Record::from_rdata(name.clone(), 900, RData::DNSSEC(DNSSECRData::NSEC3(nsec3)));
        Rrset {
            name,
            record_type: RecordType::NSEC3,
            records: vec![record],
        }
    }

    fn nsec_rrset(owner: &str, types: Vec<RecordType>) -> Rrset {
        let name = Name::from_str(owner).unwrap();
        let nsec = NSEC::new(Name::from_str("zzz.example.").unwrap(), types);
        let record = Record::from_rdata(name.clone(), 900, RData::DNSSEC(DNSSECRData::NSEC(nsec)));
        Rrset {
            name,
            record_type: RecordType::NSEC,
            records: vec![record],
        }
    }

    fn owner_for(child: &str, zone: &str) -> String {
        let hash =
            SignatureVerifier::nsec3_hash(child, SALT, ITERATIONS, Nsec3HashAlgorithm::SHA1)
                .unwrap();
        format!("{}.{}", hash.to_ascii_lowercase(), zone)
    }

    #[test]
    fn test_proof_labels() {
        assert_eq!(DenialProof::Nsec.as_str(), "NSEC");
        assert_eq!(DenialProof::Nsec3.as_str(), "NSEC3");
    }

    #[test]
    fn test_nsec3_matching_owner_without_ds_proves() {
        let child = "unsigned.example.";
        let set = nsec3_rrset(
            &owner_for(child, "example."),
            vec![RecordType::NS, RecordType::RRSIG],
        );
        assert!(DenialProver::nsec3_names_child(child, &set).unwrap());
    }

    #[test]
    fn test_nsec3_matching_owner_listing_ds_is_contradiction() {
        let child = "unsigned.example.";
        let set = nsec3_rrset(
            &owner_for(child, "example."),
            vec![RecordType::NS, RecordType::DS],
        );
        let err = DenialProver::nsec3_names_child(child, &set).unwrap_err();
        assert!(matches!(err, ProbeError::ShouldNotHappen(_)));
    }

    #[test]
    fn test_nsec3_foreign_owner_does_not_prove() {
        let child = "unsigned.example.";
        let set = nsec3_rrset(
            &owner_for("someone-else.example.", "example."),
            vec![RecordType::NS],
        );
        assert!(!DenialProver::nsec3_names_child(child, &set).unwrap());
    }

    #[test]
    fn test_nsec_owner_equality_and_bitmap() {
        let child = "unsigned.example.";
        let matching = nsec_rrset(child, vec![RecordType::NS, RecordType::SOA]);
        assert!(DenialProver::nsec_names_child(child, &matching).unwrap());

        let wrong_owner = nsec_rrset("other.example.", vec![RecordType::NS]);
        assert!(!DenialProver::nsec_names_child(child, &wrong_owner).unwrap());

        let with_ds = nsec_rrset(child, vec![RecordType::DS]);
        assert!(matches!(
            DenialProver::nsec_names_child(child, &with_ds),
            Err(ProbeError::ShouldNotHappen(_))
        ));
    }

    #[test]
    fn test_prove_without_any_denial_is_missing_resource() {
        let parent = Zone::root("198.41.0.4".parse().unwrap(), Default::default());
        let response = Message::new(0, MessageType::Response, OpCode::Query);
        let err = DenialProver::prove("unsigned.example.", &parent, &response).unwrap_err();
        assert!(matches!(err, ProbeError::MissingResource(_)));
    }

    #[test]
    fn test_prove_rejects_unsigned_nsec3() {
        // An NSEC3 covering the child but carrying no RRSIG at all must not
        // prove anything.
        let parent = Zone::root("198.41.0.4".parse().unwrap(), Default::default());
        let child = "unsigned.example.";
        let owner = owner_for(child, "example.");

        let mut response = Message::new(0, MessageType::Response, OpCode::Query);
        for record in nsec3_rrset(&owner, vec![RecordType::NS]).records {
            response.add_name_server(record);
        }
        let err = DenialProver::prove(child, &parent, &response);
        assert!(matches!(err, Err(ProbeError::MissingResource(_))));
    }
}
