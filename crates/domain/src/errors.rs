use thiserror::Error;

/// Failure taxonomy of the prober. Every terminal chain state except
/// `VALIDATED` maps back to exactly one of these kinds.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No response within the deadline, UDP and the TCP fallback included.
    /// Carries `TYPE@name` of the query that stalled.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server answered with a non-zero RCODE. Carries `TYPE@name: RCODE`.
    #[error("query error: {0}")]
    Query(String),

    /// An RRset that must be present was absent (SOA of a zone, A of the
    /// SOA MNAME, DNSKEY at the apex).
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The parent cryptographically proved, via NSEC or NSEC3, that no DS
    /// exists for this zone.
    #[error("insecure delegation: {0}")]
    InsecureDelegation(String),

    /// A denial-of-existence record covering the owner listed DS in its type
    /// bitmap. The record contradicts the response it arrived in.
    #[error("{0}")]
    ShouldNotHappen(String),

    /// A zero-length DS or DNSKEY set where validation requires at least one
    /// entry.
    #[error("empty {0} set")]
    EmptyRrset(&'static str),

    /// Malformed wire data, un-encodable names, or a protocol-level surprise.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Socket-level failure that is not a timeout.
    #[error("i/o error: {0}")]
    Io(String),
}

impl ProbeError {
    /// Stable name of the variant, used when an unclassified error is
    /// reported as `OTHER` and the reason must identify the kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "Timeout",
            Self::Query(_) => "Query",
            Self::MissingResource(_) => "MissingResource",
            Self::InsecureDelegation(_) => "InsecureDelegation",
            Self::ShouldNotHappen(_) => "ShouldNotHappen",
            Self::EmptyRrset(_) => "EmptyRrset",
            Self::Protocol(_) => "Protocol",
            Self::Io(_) => "Io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_query_context() {
        let err = ProbeError::Timeout("DS@example.com.".to_string());
        assert_eq!(err.to_string(), "timeout: DS@example.com.");

        let err = ProbeError::Query("DNSKEY@example.com.: SERVFAIL".to_string());
        assert_eq!(err.to_string(), "query error: DNSKEY@example.com.: SERVFAIL");
    }

    #[test]
    fn test_kind_names_are_distinct() {
        let kinds = [
            ProbeError::Timeout(String::new()).kind_name(),
            ProbeError::Query(String::new()).kind_name(),
            ProbeError::MissingResource(String::new()).kind_name(),
            ProbeError::InsecureDelegation(String::new()).kind_name(),
            ProbeError::ShouldNotHappen(String::new()).kind_name(),
            ProbeError::EmptyRrset("DS").kind_name(),
            ProbeError::Protocol(String::new()).kind_name(),
            ProbeError::Io(String::new()).kind_name(),
        ];
        let mut unique: Vec<_> = kinds.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), kinds.len());
    }
}
