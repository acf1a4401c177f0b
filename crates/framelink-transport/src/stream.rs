use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected TCP stream implementing `Read + Write`.
///
/// This is the duplex handle every framed connection is built on. It is
/// exclusively owned; splitting a connection into a read half and a write
/// half goes through [`FrameStream::try_clone`].
pub struct FrameStream {
    inner: TcpStream,
}

impl Read for FrameStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for FrameStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl From<TcpStream> for FrameStream {
    fn from(inner: TcpStream) -> Self {
        Self { inner }
    }
}

impl FrameStream {
    /// Set read timeout on the underlying socket. `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying socket. `None` blocks forever.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Enable or disable Nagle's algorithm.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor for the same socket).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from(cloned))
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    /// Local address of this end of the stream.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Shut down one or both directions of the socket.
    ///
    /// Shutdown affects every clone of this stream.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        self.inner.shutdown(how).map_err(Into::into)
    }

    /// Borrow the raw TCP stream.
    pub fn as_tcp(&self) -> &TcpStream {
        &self.inner
    }

    /// Consume the wrapper and return the raw TCP stream.
    pub fn into_tcp(self) -> TcpStream {
        self.inner
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("FrameStream");
        if let Ok(local) = self.inner.local_addr() {
            dbg.field("local", &local);
        }
        if let Ok(peer) = self.inner.peer_addr() {
            dbg.field("peer", &peer);
        }
        dbg.finish()
    }
}
