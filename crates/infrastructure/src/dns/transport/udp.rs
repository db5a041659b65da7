//! UDP side of the prober. One query, one datagram exchange; there is no
//! retransmission here because the chain logic treats a missed deadline as
//! final.

use super::{deadline, DnsTransport, TransportError, TransportResponse};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

/// Receive buffer size, matching the EDNS payload size the client
/// advertises in its OPT record.
pub const EDNS_BUFFER_SIZE: usize = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    /// An unspecified local address in the server's family; the OS picks
    /// the port.
    fn local_wildcard(&self) -> SocketAddr {
        let ip: IpAddr = match self.server_addr {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        SocketAddr::new(ip, 0)
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let server = self.server_addr;
        let socket = UdpSocket::bind(self.local_wildcard())
            .await
            .map_err(|e| TransportError::Io(format!("udp bind failed: {}", e)))?;

        // The deadline spans the whole exchange. Datagrams arriving from
        // anyone but the queried server are dropped, not taken as answers.
        let bytes = deadline(timeout, "udp exchange with", server, async {
            socket.send_to(message_bytes, server).await?;
            loop {
                let mut buf = vec![0u8; EDNS_BUFFER_SIZE];
                let (len, from) = socket.recv_from(&mut buf).await?;
                if from.ip() == server.ip() {
                    buf.truncate(len);
                    return Ok(buf);
                }
                trace!(%from, "discarding datagram from unexpected source");
            }
        })
        .await?;

        debug!(%server, len = bytes.len(), "udp response");
        Ok(TransportResponse {
            bytes,
            protocol_used: "UDP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
