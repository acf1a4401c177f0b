use std::io::{ErrorKind, Write};

use bytes::Bytes;
use tracing::trace;

use crate::codec::{encode_header, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Writes complete frames to any `Write` stream.
///
/// The header goes out in one write call and the payload is written straight
/// from the caller's slice, with no intermediate buffer.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, payload: &Bytes) -> Result<()> {
        self.send(payload.as_ref())
    }

    /// Frame and send a payload.
    ///
    /// Oversized payloads are rejected before anything reaches the stream.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let header = encode_header(payload.len(), self.config.max_frame_size)?;

        loop {
            match self.inner.write(&header) {
                Ok(HEADER_SIZE) => break,
                Ok(written) => {
                    return Err(FrameError::HeaderWrite {
                        written,
                        source: std::io::Error::new(ErrorKind::WriteZero, "short header write"),
                    })
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(FrameError::HeaderWrite {
                        written: 0,
                        source: err,
                    })
                }
            }
        }

        let total = payload.len();
        let mut written = 0usize;
        while written < total {
            match self.inner.write(&payload[written..]) {
                Ok(0) => {
                    return Err(FrameError::PayloadWrite {
                        written,
                        total,
                        source: std::io::Error::new(ErrorKind::WriteZero, "stream accepted no bytes"),
                    })
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(FrameError::PayloadWrite {
                        written,
                        total,
                        source: err,
                    })
                }
            }
        }

        self.inner.flush().map_err(|err| FrameError::PayloadWrite {
            written,
            total,
            source: err,
        })?;
        trace!(len = total, "frame written");
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum frame size for subsequent writes.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
