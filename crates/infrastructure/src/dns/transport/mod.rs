//! Raw transport for the prober's two on-wire protocols, UDP and TCP on
//! port 53.
//!
//! Each transport runs a whole exchange under one deadline. The distinction
//! between "the server never answered" and "the socket failed" is drawn
//! here, once, in `deadline`; everything above only sees `TransportError`.

pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure, before any DNS semantics apply.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The deadline elapsed before a complete response arrived.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure (bind, connect, send, short read).
    #[error("{0}")]
    Io(String),
}

/// Result of a raw DNS transport operation.
#[derive(Debug)]
pub struct TransportResponse {
    /// Raw DNS response bytes (wire format).
    pub bytes: Vec<u8>,
    /// Which protocol produced them.
    pub protocol_used: &'static str,
}

/// Trait for sending one raw DNS message and reading one response.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;

    fn protocol_name(&self) -> &'static str;
}

/// Drive one I/O exchange to completion or to the deadline. An elapsed
/// deadline maps to `Timeout`; a socket error maps to `Io`, tagged with the
/// peer it happened against.
pub(crate) async fn deadline<T>(
    limit: Duration,
    what: &'static str,
    server: SocketAddr,
    exchange: impl Future<Output = std::io::Result<T>>,
) -> Result<T, TransportError> {
    match tokio::time::timeout(limit, exchange).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TransportError::Io(format!("{} {}: {}", what, server, e))),
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}
