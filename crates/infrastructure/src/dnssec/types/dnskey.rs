use hickory_proto::dnssec::rdata::DNSKEY;
use hickory_proto::dnssec::PublicKey;
use std::fmt;

/// A zone public key in RDATA form: what the key-tag computation, the DS
/// digest and the signature verifiers all operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnskeyRecord {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl DnskeyRecord {
    /// Lift a decoded DNSKEY out of a response record.
    pub fn from_rdata(dnskey: &DNSKEY) -> Self {
        let pk = dnskey.public_key();
        Self {
            flags: dnskey.flags(),
            protocol: 3,
            algorithm: u8::from(<dyn PublicKey>::algorithm(pk)),
            public_key: <dyn PublicKey>::public_bytes(pk).to_vec(),
        }
    }

    /// Secure Entry Point bit set: the key a parent DS conventionally points
    /// at.
    pub fn is_sep(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    /// DNSKEY RDATA in wire order: flags, protocol, algorithm, key
    /// material. Both the key tag and the DS digest are computed over this.
    pub fn rdata_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(4 + self.public_key.len());
        wire.extend_from_slice(&self.flags.to_be_bytes());
        wire.push(self.protocol);
        wire.push(self.algorithm);
        wire.extend_from_slice(&self.public_key);
        wire
    }

    /// RFC 4034 appendix B key tag: ones-complement-style sum over the
    /// RDATA, even-offset octets weighted high.
    pub fn calculate_key_tag(&self) -> u16 {
        let mut accumulator: u32 = 0;
        for (offset, octet) in self.rdata_wire().iter().enumerate() {
            accumulator += if offset % 2 == 0 {
                u32::from(*octet) << 8
            } else {
                u32::from(*octet)
            };
        }
        accumulator += accumulator >> 16;
        (accumulator & 0xFFFF) as u16
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self.algorithm {
            5 => "RSA/SHA-1",
            7 => "RSASHA1-NSEC3-SHA1",
            8 => "RSA/SHA-256",
            10 => "RSA/SHA-512",
            13 => "ECDSA P-256/SHA-256",
            14 => "ECDSA P-384/SHA-384",
            15 => "Ed25519",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for DnskeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DNSKEY(flags={}, algo={}, tag={})",
            self.flags,
            self.algorithm_name(),
            self.calculate_key_tag(),
        )
    }
}

/// Every DNSKEY in a dissected record set, decoded.
pub fn keys_from_rrset(rrset: &crate::dns::dissector::Rrset) -> Vec<DnskeyRecord> {
    use hickory_proto::dnssec::rdata::DNSSECRData;
    use hickory_proto::rr::RData;

    rrset
        .records
        .iter()
        .filter_map(|record| match record.data() {
            RData::DNSSEC(DNSSECRData::DNSKEY(dnskey)) => Some(DnskeyRecord::from_rdata(dnskey)),
            _ => None,
        })
        .collect()
}

/// Count deployed key roles by exact flag value: 257 is a KSK, 256 a ZSK.
/// Any other combination is neither and does not affect validation.
pub fn count_key_roles(keys: &[DnskeyRecord]) -> (u32, u32) {
    let mut ksk = 0;
    let mut zsk = 0;
    for key in keys {
        match key.flags {
            257 => ksk += 1,
            256 => zsk += 1,
            _ => {}
        }
    }
    (ksk, zsk)
}
