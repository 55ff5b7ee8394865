//! Connection identifiers.

use std::net::{IpAddr, SocketAddr};

/// Identifies a connection by its peer address and port.
///
/// One listening port serves every client, so the peer's address:port pair
/// is unique among live connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(SocketAddr);

impl ConnectionId {
    #[must_use]
    pub const fn new(peer: SocketAddr) -> Self {
        Self(peer)
    }

    /// Peer IP address.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.0.ip()
    }

    /// Peer port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.0.port()
    }

    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for ConnectionId {
    fn from(peer: SocketAddr) -> Self {
        Self(peer)
    }
}

impl<I: Into<IpAddr>> From<(I, u16)> for ConnectionId {
    fn from((ip, port): (I, u16)) -> Self {
        Self(SocketAddr::new(ip.into(), port))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
