//! One authoritative zone as the prober learns it. Discovery produces a stub
//! carrying the name and SOA; per-zone validation fills the nameserver
//! address and the DNSKEY set. Fully validated zones are shared by reference
//! through the caches.

use crate::dns::dissector::SignedRrset;
use crate::dnssec::types::{dnskey, DnskeyRecord};
use hickory_proto::rr::RData;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Zone {
    /// Fully qualified, lowercase, ends in the root label.
    pub name: String,
    /// Primary authoritative server, once resolved.
    pub ns: Option<IpAddr>,
    /// SOA set proving existence. The bootstrapped root carries none.
    pub soa: Option<SignedRrset>,
    /// Apex key set, once fetched from the authoritative server.
    pub dnskey: Option<SignedRrset>,
}

impl Zone {
    /// Discovery output: existence proven by SOA, nothing else known yet.
    pub fn stub(name: impl Into<String>, soa: SignedRrset) -> Self {
        Self {
            name: name.into(),
            ns: None,
            soa: Some(soa),
            dnskey: None,
        }
    }

    /// The trust-anchor-validated root, installed by the bootstrap.
    pub fn root(ns: IpAddr, dnskey: SignedRrset) -> Self {
        Self {
            name: ".".to_string(),
            ns: Some(ns),
            soa: None,
            dnskey: Some(dnskey),
        }
    }

    /// Parsed apex keys; empty until the DNSKEY set has been fetched.
    pub fn dnskey_records(&self) -> Vec<DnskeyRecord> {
        self.dnskey
            .as_ref()
            .and_then(|signed| signed.rrset.as_ref())
            .map(dnskey::keys_from_rrset)
            .unwrap_or_default()
    }

    /// MNAME of the SOA: the primary nameserver whose A record locates the
    /// authoritative server to query.
    pub fn soa_mname(&self) -> Option<String> {
        let rrset = self.soa.as_ref()?.rrset.as_ref()?;
        for record in &rrset.records {
            if let RData::SOA(soa) = record.data() {
                return Some(soa.mname().to_string());
            }
        }
        None
    }

    pub fn is_root(&self) -> bool {
        self.name == "."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::dissector::Rrset;
    use hickory_proto::rr::rdata::SOA;
    use hickory_proto::rr::{Name, Record, RecordType};
    use std::str::FromStr;

    fn soa_rrset(zone: &str, mname: &str) -> SignedRrset {
        let name = Name::from_str(zone).unwrap();
        let soa = SOA::new(
            Name::from_str(mname).unwrap(),
            Name::from_str("hostmaster.example.com.").unwrap(),
            2024010101,
            7200,
            3600,
            1209600,
            3600,
        );
        let record = Record::from_rdata(name.clone(), 3600, RData::SOA(soa));
        SignedRrset {
            rrset: Some(Rrset {
                name,
                record_type: RecordType::SOA,
                records: vec![record],
            }),
            rrsig: None,
        }
    }

    #[test]
    fn test_stub_holds_name_and_soa_only() {
        let zone = Zone::stub("example.com.", soa_rrset("example.com.", "ns1.example.com."));
        assert_eq!(zone.name, "example.com.");
        assert!(zone.ns.is_none());
        assert!(zone.dnskey.is_none());
        assert!(!zone.is_root());
        assert!(zone.dnskey_records().is_empty());
    }

    #[test]
    fn test_soa_mname() {
        let zone = Zone::stub("example.com.", soa_rrset("example.com.", "ns1.example.com."));
        assert_eq!(zone.soa_mname().as_deref(), Some("ns1.example.com."));
    }

    #[test]
    fn test_root_zone_shape() {
        let root = Zone::root("198.41.0.4".parse().unwrap(), SignedRrset::default());
        assert!(root.is_root());
        assert!(root.soa.is_none());
        assert!(root.ns.is_some());
        assert!(root.soa_mname().is_none());
    }
}
