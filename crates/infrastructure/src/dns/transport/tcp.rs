//! TCP fallback for truncated answers. RFC 1035 §4.2.2 puts two length
//! octets in front of each message; a fresh connection per query is plenty
//! for the probe's retry-free access pattern.

use super::{deadline, DnsTransport, TransportError, TransportResponse};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

/// Prepend the two-octet length, producing one writable frame.
fn frame(message: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(2 + message.len());
    framed.extend_from_slice(&(message.len() as u16).to_be_bytes());
    framed.extend_from_slice(message);
    framed
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        // the length prefix is a u16; anything bigger cannot be framed
        if message_bytes.len() > usize::from(u16::MAX) {
            return Err(TransportError::Io(
                "query exceeds the 64KB TCP frame limit".to_string(),
            ));
        }

        let server = self.server_addr;
        // connect, write and read all share one deadline
        let bytes = deadline(timeout, "tcp exchange with", server, async {
            let mut stream = TcpStream::connect(server).await?;
            stream.write_all(&frame(message_bytes)).await?;

            let mut len_octets = [0u8; 2];
            stream.read_exact(&mut len_octets).await?;
            let mut response = vec![0u8; usize::from(u16::from_be_bytes(len_octets))];
            stream.read_exact(&mut response).await?;
            Ok(response)
        })
        .await?;

        debug!(%server, len = bytes.len(), "tcp response");
        Ok(TransportResponse {
            bytes,
            protocol_used: "TCP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}
