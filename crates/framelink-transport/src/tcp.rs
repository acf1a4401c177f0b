use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::FrameStream;

/// Resolve `addr` (e.g. `"127.0.0.1:7000"` or `"localhost:7000"`) to a single socket address.
///
/// The first address returned by the resolver wins.
pub fn resolve(addr: &str) -> Result<SocketAddr> {
    let mut candidates = addr.to_socket_addrs().map_err(|e| TransportError::Address {
        addr: addr.to_string(),
        source: e,
    })?;
    candidates.next().ok_or_else(|| TransportError::Address {
        addr: addr.to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "address resolved to no socket addresses",
        ),
    })
}

/// Resolve `addr` and connect to it (blocking active open).
pub fn connect(addr: &str) -> Result<FrameStream> {
    let target = resolve(addr)?;
    let stream = TcpStream::connect(target).map_err(|e| TransportError::Connect {
        addr: target,
        source: e,
    })?;
    debug!(%target, "connected");
    Ok(FrameStream::from(stream))
}

/// A bound, listening TCP socket (passive open).
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpAcceptor {
    /// Resolve `addr` and bind a listening socket to it.
    ///
    /// Port `0` asks the OS for an ephemeral port; [`TcpAcceptor::local_addr`]
    /// reports the one actually bound.
    pub fn bind(addr: &str) -> Result<Self> {
        let target = resolve(addr)?;
        let listener = TcpListener::bind(target).map_err(|e| TransportError::Bind {
            addr: target,
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: target,
            source: e,
        })?;

        info!(%local_addr, "listening on tcp socket");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(FrameStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok((FrameStream::from(stream), peer))
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// An address a local client can connect to in order to reach this socket.
    ///
    /// Wildcard binds (`0.0.0.0`, `::`) are mapped to the matching loopback address.
    pub fn loopback_addr(&self) -> SocketAddr {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.local_addr.port())
    }
}

impl std::fmt::Debug for TcpAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpAcceptor")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}
