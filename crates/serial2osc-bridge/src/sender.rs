//! UDP transport for OSC packets.

use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use serial2osc_core::OutboundMessage;
use serial2osc_protocol::encode_message;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::{BridgeError, SendError};

/// Resolve the OSC destination, preferring IPv4.
///
/// OSC receivers such as SuperCollider usually listen on IPv4 only, while
/// "localhost" may resolve to `::1` first.
pub async fn resolve_target(host: &str, port: u16) -> Result<SocketAddr, BridgeError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| BridgeError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| BridgeError::NoAddress {
            host: host.to_string(),
            port,
        })
}

/// Destination for outbound messages.
pub trait MessageSink: Send + Sync {
    /// Where messages go, for log output.
    fn target(&self) -> SocketAddr;

    /// Deliver one message.
    fn send(&self, msg: &OutboundMessage) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// Sends one OSC packet per datagram to a fixed destination.
///
/// The socket is left unconnected, so an ICMP "port unreachable" from a
/// receiver that is not running never surfaces as a send error. Only local
/// I/O failures are reported.
#[derive(Debug)]
pub struct OscSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscSender {
    /// Bind an ephemeral local socket of the same family as `target`.
    pub async fn bind(target: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        debug!("OSC socket {} sending to {}", socket.local_addr()?, target);

        Ok(Self { socket, target })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send_packet(&self, msg: &OutboundMessage) -> Result<(), SendError> {
        let packet = encode_message(msg)?;
        let sent = self.socket.send_to(&packet, self.target).await?;
        if sent != packet.len() {
            return Err(SendError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short datagram write: {} of {} bytes", sent, packet.len()),
            )));
        }
        trace!("Sent {} to {}", msg, self.target);
        Ok(())
    }
}

impl MessageSink for OscSender {
    fn target(&self) -> SocketAddr {
        self.target
    }

    fn send(&self, msg: &OutboundMessage) -> impl Future<Output = Result<(), SendError>> + Send {
        self.send_packet(msg)
    }
}
