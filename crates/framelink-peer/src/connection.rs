use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use framelink_frame::{FrameConfig, FrameReader, FrameWriter};
use framelink_transport::FrameStream;
use tracing::debug;

use crate::error::Result;

/// Socket and framing options applied when a connection is created.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Frame size limit and header read mode.
    pub frame: FrameConfig,
    /// Disable Nagle's algorithm on the socket.
    pub nodelay: bool,
    /// Read timeout on the socket. `None` blocks forever.
    pub read_timeout: Option<Duration>,
    /// Write timeout on the socket. `None` blocks forever.
    pub write_timeout: Option<Duration>,
}

/// A length-prefixed message connection over one TCP stream.
///
/// `send` and `receive` take `&mut self`, so each direction is used by one
/// caller at a time. To drive the two directions from different threads,
/// split the connection with [`Connection::into_split`].
///
/// Any error from `send` or `receive` leaves the stream at an unknown frame
/// boundary. Close the connection instead of retrying.
pub struct Connection {
    reader: ConnectionReader,
    writer: ConnectionWriter,
}

impl Connection {
    /// Wrap an established stream.
    pub fn from_stream(stream: FrameStream, config: &ConnectionConfig) -> Result<Self> {
        if config.nodelay {
            stream.set_nodelay(true)?;
        }
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;

        let peer_addr = stream.peer_addr().ok();
        let reader_stream = stream.try_clone()?;

        Ok(Self {
            reader: ConnectionReader {
                inner: FrameReader::with_config(reader_stream, config.frame.clone()),
                peer_addr,
            },
            writer: ConnectionWriter {
                inner: FrameWriter::with_config(stream, config.frame.clone()),
                peer_addr,
            },
        })
    }

    /// Send one payload as one frame.
    ///
    /// A zero-length payload is written as a zero header, which the receiving
    /// side rejects as an empty frame.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(payload)
    }

    /// Receive the next frame payload.
    pub fn receive(&mut self) -> Result<Bytes> {
        self.reader.receive()
    }

    /// Override the frame size limit for both directions.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.reader.inner.set_max_frame_size(max_frame_size);
        self.writer.inner.set_max_frame_size(max_frame_size);
    }

    /// Current frame size limit.
    pub fn max_frame_size(&self) -> usize {
        self.writer.inner.config().max_frame_size
    }

    /// Remote address, if the socket could report it at creation.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.writer.peer_addr
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &FrameStream {
        self.writer.inner.get_ref()
    }

    /// Give up framing and return the underlying stream.
    pub fn into_inner(self) -> FrameStream {
        self.writer.inner.into_inner()
    }

    /// Split into independently owned receive and send halves.
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        (self.reader, self.writer)
    }

    /// Shut down both directions and release the socket.
    ///
    /// Fails if the socket is already disconnected; callers tearing down
    /// usually ignore that error.
    pub fn close(self) -> Result<()> {
        debug!(peer = ?self.peer_addr(), "closing connection");
        self.writer.inner.get_ref().shutdown(Shutdown::Both)?;
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr())
            .field("max_frame_size", &self.max_frame_size())
            .finish()
    }
}

/// Receiving half of a split [`Connection`].
pub struct ConnectionReader {
    inner: FrameReader<FrameStream>,
    peer_addr: Option<SocketAddr>,
}

impl ConnectionReader {
    /// Receive the next frame payload.
    pub fn receive(&mut self) -> Result<Bytes> {
        Ok(self.inner.read_frame()?)
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.inner.set_max_frame_size(max_frame_size);
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Shut down the read direction.
    pub fn close(self) -> Result<()> {
        self.inner.get_ref().shutdown(Shutdown::Read)?;
        Ok(())
    }
}

/// Sending half of a split [`Connection`].
pub struct ConnectionWriter {
    inner: FrameWriter<FrameStream>,
    peer_addr: Option<SocketAddr>,
}

impl ConnectionWriter {
    /// Send one payload as one frame.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        Ok(self.inner.send(payload)?)
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.inner.set_max_frame_size(max_frame_size);
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Shut down the write direction; the peer sees end-of-stream.
    pub fn close(self) -> Result<()> {
        self.inner.get_ref().shutdown(Shutdown::Write)?;
        Ok(())
    }
}
