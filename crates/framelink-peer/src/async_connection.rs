use std::net::SocketAddr;

use bytes::Bytes;
use framelink_frame::{AsyncFrameReader, AsyncFrameWriter, FrameConfig};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::connection::ConnectionConfig;
use crate::error::Result;

/// Async counterpart of [`crate::Connection`] on a tokio `TcpStream`.
///
/// Same framing rules, same error taxonomy. Socket timeouts from
/// [`ConnectionConfig`] do not apply here; wrap calls in
/// `tokio::time::timeout` instead.
pub struct AsyncConnection {
    reader: AsyncFrameReader<OwnedReadHalf>,
    writer: AsyncFrameWriter<OwnedWriteHalf>,
    peer_addr: Option<SocketAddr>,
}

impl AsyncConnection {
    /// Resolve `addr` and connect with default settings.
    pub async fn dial(addr: &str) -> Result<Self> {
        Self::dial_with_config(addr, &ConnectionConfig::default()).await
    }

    /// Resolve and connect with explicit configuration.
    pub async fn dial_with_config(addr: &str, config: &ConnectionConfig) -> Result<Self> {
        let stream = framelink_transport::tokio_tcp::connect(addr).await?;
        Self::from_stream(stream, config)
    }

    /// Wrap an established stream.
    pub fn from_stream(stream: TcpStream, config: &ConnectionConfig) -> Result<Self> {
        if config.nodelay {
            stream
                .set_nodelay(true)
                .map_err(framelink_transport::TransportError::Io)?;
        }
        let peer_addr = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: AsyncFrameReader::with_config(read_half, config.frame.clone()),
            writer: AsyncFrameWriter::with_config(write_half, config.frame.clone()),
            peer_addr,
        })
    }

    /// Send one payload as one frame.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        Ok(self.writer.send(payload).await?)
    }

    /// Receive the next frame payload.
    pub async fn receive(&mut self) -> Result<Bytes> {
        Ok(self.reader.read_frame().await?)
    }

    /// Override the frame size limit for both directions.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.reader.set_max_frame_size(max_frame_size);
        self.writer.set_max_frame_size(max_frame_size);
    }

    pub fn max_frame_size(&self) -> usize {
        self.writer.config().max_frame_size
    }

    pub fn frame_config(&self) -> &FrameConfig {
        self.writer.config()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Shut down the write side and drop the socket.
    pub async fn close(mut self) -> Result<()> {
        debug!(peer = ?self.peer_addr, "closing connection");
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl std::fmt::Debug for AsyncConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncConnection")
            .field("peer_addr", &self.peer_addr)
            .field("max_frame_size", &self.max_frame_size())
            .finish()
    }
}
