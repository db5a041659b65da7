//! Response dissection: pull record sets out of a parsed DNS message.
//!
//! Sections are scanned answer → authority → additional. RRSIG extraction is
//! always filtered by the *covered* type, so signatures over NSEC3 are never
//! confused with signatures over DS arriving in the same response.

use hickory_proto::dnssec::rdata::DNSSECRData;
use hickory_proto::op::Message;
use hickory_proto::rr::{Name, RData, Record, RecordType};

/// The records of one owner name and type, wire data preserved.
#[derive(Debug, Clone)]
pub struct Rrset {
    pub name: Name,
    pub record_type: RecordType,
    pub records: Vec<Record>,
}

impl Rrset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record set together with the RRSIG set covering it. Either half may be
/// absent; the validator interprets absence in context.
#[derive(Debug, Clone, Default)]
pub struct SignedRrset {
    pub rrset: Option<Rrset>,
    pub rrsig: Option<Rrset>,
}

pub struct Dissector;

impl Dissector {
    /// The type an RRSIG record signs; `None` for every other record type.
    fn covered(record: &Record) -> Option<RecordType> {
        match record.data() {
            RData::DNSSEC(DNSSECRData::RRSIG(sig)) => Some(sig.input().type_covered),
            _ => None,
        }
    }

    fn matches(record: &Record, rtype: RecordType, covers: Option<RecordType>) -> bool {
        record.record_type() == rtype && Self::covered(record) == covers
    }

    fn sections(message: &Message) -> [&[Record]; 3] {
        [
            message.answers(),
            message.name_servers(),
            message.additionals(),
        ]
    }

    /// First record set matching the filter. All records sharing the owner
    /// name of the first hit, within the same section, form the set.
    pub fn first_rrset(
        message: &Message,
        rtype: RecordType,
        covers: Option<RecordType>,
    ) -> Option<Rrset> {
        for section in Self::sections(message) {
            let mut found: Option<Rrset> = None;
            for record in section {
                if !Self::matches(record, rtype, covers) {
                    continue;
                }
                match &mut found {
                    None => {
                        found = Some(Rrset {
                            name: record.name().clone(),
                            record_type: rtype,
                            records: vec![record.clone()],
                        });
                    }
                    Some(set) if set.name == *record.name() => {
                        set.records.push(record.clone());
                    }
                    Some(_) => {}
                }
            }
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Every record set matching the filter, grouped by owner name, section
    /// order preserved. NSEC3 denials routinely span several owners.
    pub fn all_rrsets(
        message: &Message,
        rtype: RecordType,
        covers: Option<RecordType>,
    ) -> Vec<Rrset> {
        let mut sets: Vec<Rrset> = Vec::new();
        for section in Self::sections(message) {
            for record in section {
                if !Self::matches(record, rtype, covers) {
                    continue;
                }
                if let Some(set) = sets.iter_mut().find(|s| s.name == *record.name()) {
                    set.records.push(record.clone());
                } else {
                    sets.push(Rrset {
                        name: record.name().clone(),
                        record_type: rtype,
                        records: vec![record.clone()],
                    });
                }
            }
        }
        sets
    }

    /// The record set for `rtype` paired with the RRSIG set covering it.
    pub fn signed_rrset(message: &Message, rtype: RecordType) -> SignedRrset {
        SignedRrset {
            rrset: Self::first_rrset(message, rtype, None),
            rrsig: Self::first_rrset(message, RecordType::RRSIG, Some(rtype)),
        }
    }
}
