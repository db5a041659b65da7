//! Zone discovery: which of the candidate suffixes of an input name are
//! actual zone cuts.
//!
//! A candidate exists as a zone only when a SOA query returns an RRset whose
//! owner equals the candidate exactly. A SOA owned by an ancestor means the
//! candidate is a name *inside* that ancestor's zone, not a cut. Results,
//! positive and negative, are cached for the lifetime of the process.

use crate::dns::client::DnsClient;
use crate::dns::names;
use crate::dnssec::validation::context::ValidatorContext;
use crate::dnssec::zone::Zone;
use chainprobe_domain::ProbeError;
use hickory_proto::rr::RecordType;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

pub struct ZoneDiscoverer {
    client: Arc<DnsClient>,
    context: Arc<ValidatorContext>,
    resolver: IpAddr,
}

impl ZoneDiscoverer {
    pub fn new(client: Arc<DnsClient>, context: Arc<ValidatorContext>, resolver: IpAddr) -> Self {
        Self {
            client,
            context,
            resolver,
        }
    }

    /// The existing zone cuts covering `domain`, ordered root-most first.
    /// The root itself is bootstrapped separately and never appears here.
    pub async fn discover(&self, domain: &str) -> Result<Vec<Arc<Zone>>, ProbeError> {
        let mut zones = Vec::new();
        for candidate in candidate_names(domain) {
            if let Some(zone) = self.lookup(candidate).await? {
                zones.push(zone);
            }
        }
        zones.reverse();
        Ok(zones)
    }

    async fn lookup(&self, name: String) -> Result<Option<Arc<Zone>>, ProbeError> {
        if self.context.is_nonexisting(&name) {
            return Ok(None);
        }
        if let Some(zone) = self.context.existing(&name) {
            return Ok(Some(zone));
        }

        let soa = self
            .client
            .query(&name, RecordType::SOA, self.resolver)
            .await?;
        let Some(rrset) = &soa.rrset else {
            // without an answer RRset the owner cannot be verified
            return Err(ProbeError::MissingResource(format!("{} - SOA", name)));
        };

        let owner = names::normalize(&rrset.name.to_string());
        if owner == name {
            debug!(zone = %name, "zone exists");
            let zone = Arc::new(Zone::stub(name, soa));
            self.context.mark_existing(zone.clone());
            Ok(Some(zone))
        } else {
            debug!(candidate = %name, soa_owner = %owner, "SOA owner mismatch, no zone cut");
            self.context.mark_nonexisting(name);
            Ok(None)
        }
    }
}

/// All suffix candidates of a name, full name first, normalized. The root
/// label alone is not a candidate.
pub(crate) fn candidate_names(domain: &str) -> Vec<String> {
    let normalized = names::normalize(domain);
    if normalized == "." {
        return Vec::new();
    }
    let labels: Vec<&str> = normalized.split('.').collect();
    let mut out = Vec::new();
    // the final element is the empty root label; stop before it
    for start in 0..labels.len() - 1 {
        out.push(labels[start..].join("."));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_full_name_first() {
        assert_eq!(
            candidate_names("www.example.com"),
            vec!["www.example.com.", "example.com.", "com."]
        );
    }

    #[test]
    fn test_candidates_normalize_input() {
        assert_eq!(
            candidate_names("Example.COM."),
            vec!["example.com.", "com."]
        );
    }

    #[test]
    fn test_candidates_single_label() {
        assert_eq!(candidate_names("org"), vec!["org."]);
    }

    #[test]
    fn test_root_has_no_candidates() {
        assert!(candidate_names(".").is_empty());
        assert!(candidate_names("").is_empty());
    }
}
