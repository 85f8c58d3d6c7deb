use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Blocking UDP socket carrying one frame per datagram.
///
/// Created either connected to a single peer (sender side) or bound to a
/// local address (listener side).
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    local: SocketAddr,
    peer: Option<SocketAddr>,
}

impl UdpEndpoint {
    /// Open an ephemeral socket connected to `endpoint` (`host:port`).
    pub fn connect(endpoint: &str) -> Result<Self> {
        let peer = resolve(endpoint)?;
        let bind_addr = unspecified_for(&peer);
        let socket = UdpSocket::bind(bind_addr).map_err(|source| TransportError::Bind {
            addr: bind_addr,
            source,
        })?;
        socket
            .connect(peer)
            .map_err(|source| TransportError::Connect { addr: peer, source })?;
        let local = socket.local_addr()?;
        debug!(%local, %peer, "udp socket connected");
        Ok(Self {
            socket,
            local,
            peer: Some(peer),
        })
    }

    /// Bind a socket for receiving on `addr` (`host:port`, port 0 for ephemeral).
    pub fn bind(addr: &str) -> Result<Self> {
        let requested = resolve(addr)?;
        let socket = UdpSocket::bind(requested).map_err(|source| TransportError::Bind {
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
    ///
    /// A short send is reported as [`TransportError::Truncated`] rather than
    /// retried: the receiver would see two broken frames otherwise.
    pub fn send(&self, packet: &[u8]) -> Result<()> {
        let sent = self.socket.send(packet).map_err(TransportError::Write)?;
        check_sent(sent, packet.len())
    }

    /// Send one datagram to an explicit address.
    pub fn send_to(&self, packet: &[u8], addr: SocketAddr) -> Result<()> {
        let sent = self
            .socket
            .send_to(packet, addr)
            .map_err(TransportError::Write)?;
        check_sent(sent, packet.len())
    }

    /// Receive one datagram (blocking, subject to the read timeout).
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf)?)
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout).map_err(Into::into)
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

pub(crate) fn check_sent(sent: usize, len: usize) -> Result<()> {
    if sent == len {
        Ok(())
    } else {
        Err(TransportError::Truncated { sent, len })
    }
}

/// Resolve `host:port` to the first matching socket address.
pub(crate) fn resolve(endpoint: &str) -> Result<SocketAddr> {
    let mut addrs = endpoint
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::Resolve {
        endpoint: endpoint.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
    })
}

/// Wildcard address of the same family as `peer`, ephemeral port.
pub(crate) fn unspecified_for(peer: &SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_send_recv() {
        let listener = UdpEndpoint::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let sender = UdpEndpoint::connect(&listener.local_addr().to_string()).unwrap();
        assert_eq!(sender.peer_addr(), Some(listener.local_addr()));
        sender.send(b"frame").unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"frame");
        assert_eq!(from, sender.local_addr());
    }

    #[test]
    fn send_to_explicit_address() {
        let listener = UdpEndpoint::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let sender = UdpEndpoint::bind("127.0.0.1:0").unwrap();
        assert!(sender.peer_addr().is_none());

        sender.send_to(b"hi", listener.local_addr()).unwrap();
        let mut buf = [0u8; 8];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hi");
    }

    #[test]
    fn each_datagram_is_one_frame() {
        let listener = UdpEndpoint::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let sender = UdpEndpoint::connect(&listener.local_addr().to_string()).unwrap();

        sender.send(b"one").unwrap();
        sender.send(b"two").unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"one");
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"two");
    }

    #[test]
    fn read_timeout_surfaces_as_io_error() {
        let listener = UdpEndpoint::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let mut buf = [0u8; 8];
        let err = listener.recv_from(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn unresolvable_endpoint() {
        let err = UdpEndpoint::connect("not an endpoint").unwrap_err();
        assert!(matches!(err, TransportError::Resolve { .. }));
    }

    #[test]
    fn short_send_is_truncation() {
        assert!(check_sent(40, 40).is_ok());
        assert!(matches!(
            check_sent(12, 40),
            Err(TransportError::Truncated { sent: 12, len: 40 })
        ));
    }

    #[test]
    fn unspecified_matches_family() {
        let v4: SocketAddr = "10.0.0.1:14550".parse().unwrap();
        let v6: SocketAddr = "[::1]:14550".parse().unwrap();
        assert!(unspecified_for(&v4).is_ipv4());
        assert!(unspecified_for(&v6).is_ipv6());
        assert_eq!(unspecified_for(&v4).port(), 0);
    }
}
