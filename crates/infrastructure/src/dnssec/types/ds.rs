use hickory_proto::dnssec::rdata::DS;
use std::fmt;

/// A delegation signer record: the parent-side hash of a child DNSKEY.
/// Equality over all four fields is exactly the chain-link test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsRecord {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

impl DsRecord {
    pub fn from_rdata(ds: &DS) -> Self {
        Self {
            key_tag: ds.key_tag(),
            algorithm: u8::from(ds.algorithm()),
            digest_type: u8::from(ds.digest_type()),
            digest: ds.digest().to_vec(),
        }
    }

    pub fn digest_type_name(&self) -> &'static str {
        match self.digest_type {
            1 => "SHA-1",
            2 => "SHA-256",
            4 => "SHA-384",
            _ => "Unknown",
        }
    }
}

/// Every DS in a dissected record set, decoded.
pub fn records_from_rrset(rrset: &crate::dns::dissector::Rrset) -> Vec<DsRecord> {
    use hickory_proto::dnssec::rdata::DNSSECRData;
    use hickory_proto::rr::RData;

    rrset
        .records
        .iter()
        .filter_map(|record| match record.data() {
            RData::DNSSEC(DNSSECRData::DS(ds)) => Some(DsRecord::from_rdata(ds)),
            _ => None,
        })
        .collect()
}

impl fmt::Display for DsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DS(tag={}, algo={}, digest={})",
            self.key_tag,
            self.algorithm,
            self.digest_type_name()
        )
    }
}
