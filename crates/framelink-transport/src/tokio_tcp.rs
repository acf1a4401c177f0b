//! Tokio counterparts of the blocking TCP operations.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Resolve `addr` to a single socket address without blocking the runtime.
pub async fn resolve(addr: &str) -> Result<SocketAddr> {
    let mut candidates = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| TransportError::Address {
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

/// Resolve and connect.
pub async fn connect(addr: &str) -> Result<TcpStream> {
    let target = resolve(addr).await?;
    let stream = TcpStream::connect(target)
        .await
        .map_err(|e| TransportError::Connect {
            addr: target,
            source: e,
        })?;
    debug!(%target, "connected");
    Ok(stream)
}

/// Resolve and bind a listening socket.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let target = resolve(addr).await?;
    let listener = TcpListener::bind(target)
        .await
        .map_err(|e| TransportError::Bind {
            addr: target,
            source: e,
        })?;
    if let Ok(local_addr) = listener.local_addr() {
        info!(%local_addr, "listening on tcp socket");
    }
    Ok(listener)
}
