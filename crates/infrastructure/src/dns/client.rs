//! One-shot authoritative DNS queries with DNSSEC OK set.
//!
//! Every query goes out over UDP first; a truncated response is retried once
//! over TCP. There are no other retries: a deadline miss surfaces as
//! `ProbeError::Timeout` and a non-zero RCODE as `ProbeError::Query`, both
//! tagged `TYPE@name` so reports can name the query that failed.

use crate::dns::dissector::{Dissector, SignedRrset};
use crate::dns::names;
use crate::dns::transport::tcp::TcpTransport;
use crate::dns::transport::udp::{UdpTransport, EDNS_BUFFER_SIZE};
use crate::dns::transport::{DnsTransport, TransportError};
use chainprobe_domain::ProbeError;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const DNS_PORT: u16 = 53;

/// Stateless query issuer. Cloned freely; each call binds its own socket.
#[derive(Debug, Clone)]
pub struct DnsClient {
    timeout: Duration,
}

impl DnsClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Issue a single DNSSEC-OK query and return the full parsed response.
    /// The TCP fallback fires only when the UDP answer has TC set.
    pub async fn raw_query(
        &self,
        name: &str,
        rtype: RecordType,
        server: IpAddr,
    ) -> Result<Message, ProbeError> {
        let label = Self::query_label(rtype, name);
        let qname = Name::from_str(&names::normalize(name))
            .map_err(|e| ProbeError::Protocol(format!("invalid name {}: {}", name, e)))?;
        let query_bytes = Self::build_query(&qname, rtype)?;
        let server_addr = SocketAddr::new(server, DNS_PORT);

        let udp = UdpTransport::new(server_addr);
        let response = udp
            .send(&query_bytes, self.timeout)
            .await
            .map_err(|e| Self::transport_error(e, &label))?;
        let mut message = Message::from_vec(&response.bytes)
            .map_err(|e| ProbeError::Protocol(format!("failed to parse response: {}", e)))?;

        if message.truncated() {
            debug!(query = %label, server = %server_addr, "response truncated, retrying over TCP");
            let tcp = TcpTransport::new(server_addr);
            let response = tcp
                .send(&query_bytes, self.timeout)
                .await
                .map_err(|e| Self::transport_error(e, &label))?;
            message = Message::from_vec(&response.bytes)
                .map_err(|e| ProbeError::Protocol(format!("failed to parse response: {}", e)))?;
        }

        if message.response_code() != ResponseCode::NoError {
            return Err(ProbeError::Query(format!(
                "{}: {}",
                label,
                Self::rcode_name(message.response_code())
            )));
        }

        debug!(
            query = %label,
            server = %server_addr,
            answers = message.answers().len(),
            authority = message.name_servers().len(),
            "query answered"
        );

        Ok(message)
    }

    /// Issue a query and extract the requested record set together with the
    /// RRSIG set covering it.
    pub async fn query(
        &self,
        name: &str,
        rtype: RecordType,
        server: IpAddr,
    ) -> Result<SignedRrset, ProbeError> {
        let response = self.raw_query(name, rtype, server).await?;
        Ok(Dissector::signed_rrset(&response, rtype))
    }

    fn transport_error(err: TransportError, label: &str) -> ProbeError {
        match err {
            TransportError::Timeout(_) => ProbeError::Timeout(label.to_string()),
            TransportError::Io(msg) => ProbeError::Io(msg),
        }
    }

    fn query_label(rtype: RecordType, name: &str) -> String {
        format!("{}@{}", rtype, names::normalize(name))
    }

    fn build_query(name: &Name, rtype: RecordType) -> Result<Vec<u8>, ProbeError> {
        let mut query = Query::new();
        query.set_name(name.clone());
        query.set_query_type(rtype);
        query.set_query_class(DNSClass::IN);

        let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        let mut edns = Edns::new();
        edns.set_dnssec_ok(true);
        edns.set_max_payload(EDNS_BUFFER_SIZE as u16);
        edns.set_version(0);
        message.set_edns(edns);

        Self::serialize_message(&message)
    }

    fn serialize_message(message: &Message) -> Result<Vec<u8>, ProbeError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);

        message
            .emit(&mut encoder)
            .map_err(|e| ProbeError::Protocol(format!("failed to serialize DNS message: {}", e)))?;

        Ok(buf)
    }

    fn rcode_name(rcode: ResponseCode) -> String {
        match rcode {
            ResponseCode::NoError => "NOERROR".to_string(),
            ResponseCode::NXDomain => "NXDOMAIN".to_string(),
            ResponseCode::ServFail => "SERVFAIL".to_string(),
            ResponseCode::Refused => "REFUSED".to_string(),
            ResponseCode::NotImp => "NOTIMP".to_string(),
            ResponseCode::FormErr => "FORMERR".to_string(),
            other => format!("{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_sets_do_bit() {
        let name = Name::from_str("example.com.").unwrap();
        let bytes = DnsClient::build_query(&name, RecordType::DNSKEY).unwrap();
        // header + question + OPT must be present
        assert!(bytes.len() > 12);

        let parsed = Message::from_vec(&bytes).unwrap();
        assert!(parsed.recursion_desired());
        let edns = parsed.extensions().as_ref().expect("OPT record missing");
        assert!(edns.flags().dnssec_ok);
        assert_eq!(edns.max_payload(), EDNS_BUFFER_SIZE as u16);
        assert_eq!(parsed.queries().len(), 1);
        assert_eq!(parsed.queries()[0].query_type(), RecordType::DNSKEY);
    }

    #[test]
    fn test_query_label_normalizes() {
        assert_eq!(
            DnsClient::query_label(RecordType::DS, "Example.COM"),
            "DS@example.com."
        );
        assert_eq!(DnsClient::query_label(RecordType::DNSKEY, "."), "DNSKEY@.");
    }

    #[test]
    fn test_rcode_names() {
        assert_eq!(DnsClient::rcode_name(ResponseCode::NXDomain), "NXDOMAIN");
        assert_eq!(DnsClient::rcode_name(ResponseCode::ServFail), "SERVFAIL");
    }

    #[test]
    fn test_transport_error_mapping() {
        let err = DnsClient::transport_error(
            TransportError::Timeout(Duration::from_secs(3)),
            "SOA@example.com.",
        );
        assert!(matches!(err, ProbeError::Timeout(ref label) if label == "SOA@example.com."));

        let err = DnsClient::transport_error(TransportError::Io("refused".into()), "A@x.");
        assert!(matches!(err, ProbeError::Io(_)));
    }
}
