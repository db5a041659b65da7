//! Chainprobe infrastructure: DNS plumbing (transport, query construction,
//! response dissection) and the DNSSEC chain-of-trust machinery built on it.
pub mod dns;
pub mod dnssec;

pub use dns::client::DnsClient;
pub use dns::dissector::{Dissector, Rrset, SignedRrset};
pub use dnssec::validation::chain::ChainValidator;
pub use dnssec::validation::context::ValidatorContext;
