use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::PacketSink;
use crate::udp::{check_sent, unspecified_for};

/// Tokio UDP socket carrying one frame per datagram.
#[derive(Debug)]
pub struct AsyncUdpEndpoint {
    socket: UdpSocket,
    local: SocketAddr,
    peer: Option<SocketAddr>,
}

impl AsyncUdpEndpoint {
    /// Open an ephemeral socket connected to `endpoint` (`host:port`).
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let peer = resolve(endpoint).await?;
        let bind_addr = unspecified_for(&peer);
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: bind_addr,
                source,
            })?;
        socket
            .connect(peer)
            .await
            .map_err(|source| TransportError::Connect { addr: peer, source })?;
        let local = socket.local_addr()?;
        debug!(%local, %peer, "udp socket connected");
        Ok(Self {
            socket,
            local,
            peer: Some(peer),
        })
    }

    /// Bind a socket for receiving on `addr`.
    pub async fn bind(addr: &str) -> Result<Self> {
        let requested = resolve(addr).await?;
        let socket = UdpSocket::bind(requested)
            .await
            .map_err(|source| TransportError::Bind {
                addr: requested,
                source,
            })?;
        let local = socket.local_addr()?;
        info!(%local, "listening on udp socket");
        Ok(Self {
            socket,
            local,
            peer: None,
        })
    }

    /// Send one datagram to the connected peer.
    pub async fn send(&self, packet: &[u8]) -> Result<()> {
        let sent = self
            .socket
            .send(packet)
            .await
            .map_err(TransportError::Write)?;
        check_sent(sent, packet.len())
    }

    /// Receive one datagram.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf).await?)
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Connected peer, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl PacketSink for AsyncUdpEndpoint {
    async fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.send(packet).await
    }

    fn describe(&self) -> String {
        match self.peer {
            Some(peer) => format!("udp://{peer}"),
            None => format!("udp://{} (unconnected)", self.local),
        }
    }
}

async fn resolve(endpoint: &str) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host(endpoint)
        .await
        .map_err(|source| TransportError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::Resolve {
        endpoint: endpoint.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
    })
}
