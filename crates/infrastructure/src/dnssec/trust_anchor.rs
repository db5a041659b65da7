//! The compiled-in root trust anchors.
//!
//! These are the DS digests IANA publishes for the root KSKs
//! (<https://data.iana.org/root-anchors/root-anchors.xml>). The bootstrap
//! accepts a root DNSKEY set only when at least one key hashes to one of
//! them.

use crate::dnssec::crypto::SignatureVerifier;
use crate::dnssec::types::{DnskeyRecord, DsRecord};
use tracing::debug;

/// `key_tag, algorithm, digest_type, SHA-256 digest` of the published root
/// KSKs (KSK-2010 and KSK-2017).
const ROOT_ANCHORS: [(u16, u8, u8, &str); 2] = [
    (
        19036,
        8,
        2,
        "49aac11d7b6f6446702e54a1607371607a1a41855200fd2ce1cdde32f24e8fb5",
    ),
    (
        20326,
        8,
        2,
        "e06d44b80b8f1d39a95c0b0d7c65d08458e880409bbc683457104237c7f8ec8d",
    ),
];

#[derive(Debug, Clone)]
pub struct TrustAnchorStore {
    anchors: Vec<DsRecord>,
}

impl TrustAnchorStore {
    pub fn new() -> Self {
        Self {
            anchors: Self::default_root_anchors(),
        }
    }

    /// A store with the given anchors instead of the compiled-in list. Meant
    /// for tests; production always runs on the IANA set.
    pub fn with_anchors(anchors: Vec<DsRecord>) -> Self {
        Self { anchors }
    }

    fn default_root_anchors() -> Vec<DsRecord> {
        ROOT_ANCHORS
            .iter()
            .map(|(key_tag, algorithm, digest_type, digest)| DsRecord {
                key_tag: *key_tag,
                algorithm: *algorithm,
                digest_type: *digest_type,
                digest: hex::decode(digest).expect("malformed compiled-in root anchor digest"),
            })
            .collect()
    }

    pub fn anchors(&self) -> &[DsRecord] {
        &self.anchors
    }

    /// True when at least one key, hashed under the anchor's digest type,
    /// equals one of the configured anchors.
    pub fn authenticates(&self, keys: &[DnskeyRecord]) -> bool {
        for key in keys {
            for anchor in &self.anchors {
                match SignatureVerifier::make_ds(".", key, anchor.digest_type) {
                    Ok(ds) if ds == *anchor => {
                        debug!(key_tag = ds.key_tag, "root DNSKEY matches trust anchor");
                        return true;
                    }
                    _ => {}
                }
            }
        }
        false
    }
}

impl Default for TrustAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}
