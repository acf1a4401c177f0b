//! Async frame reader and writer over tokio I/O.
//!
//! Same wire rules and error taxonomy as the blocking [`crate::FrameReader`]
//! and [`crate::FrameWriter`].

use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{decode_header, encode_header, FrameConfig, HeaderReadMode, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads complete frames from an `AsyncRead`.
pub struct AsyncFrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: AsyncRead + Unpin> AsyncFrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame payload.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        let mut header = [0u8; HEADER_SIZE];
        let mut received = 0usize;
        loop {
            let n = match self.inner.read(&mut header[received..]).await {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::HeaderRead { received, source: err }),
            };
            received += n;
            if received == HEADER_SIZE {
                break;
            }
            if n == 0 || self.config.header_read == HeaderReadMode::SingleAttempt {
                return Err(FrameError::HeaderRead {
                    received,
                    source: std::io::Error::new(ErrorKind::UnexpectedEof, "short frame header"),
                });
            }
        }

        let len = decode_header(header, self.config.max_frame_size)?;
        let mut payload = BytesMut::zeroed(len);
        let mut received = 0usize;
        while received < len {
            match self.inner.read(&mut payload[received..]).await {
                Ok(0) => {
                    return Err(FrameError::PayloadRead {
                        received,
                        expected: len,
                        source: std::io::Error::new(
                            ErrorKind::UnexpectedEof,
                            "stream closed mid-payload",
                        ),
                    })
                }
                Ok(n) => received += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(FrameError::PayloadRead {
                        received,
                        expected: len,
                        source: err,
                    })
                }
            }
        }
        Ok(payload.freeze())
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Writes complete frames to an `AsyncWrite`.
pub struct AsyncFrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: AsyncWrite + Unpin> AsyncFrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Frame and send a payload.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let header = encode_header(payload.len(), self.config.max_frame_size)?;
        loop {
            match self.inner.write(&header).await {
                Ok(HEADER_SIZE) => break,
                Ok(written) => {
                    return Err(FrameError::HeaderWrite {
                        written,
                        source: std::io::Error::new(ErrorKind::WriteZero, "short header write"),
                    })
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::HeaderWrite { written: 0, source: err }),
            }
        }

        let total = payload.len();
        let mut written = 0usize;
        while written < total {
            match self.inner.write(&payload[written..]).await {
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

        self.inner
            .flush()
            .await
            .map_err(|err| FrameError::PayloadWrite {
                written,
                total,
                source: err,
            })
    }

    /// Shut down the write side of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(FrameError::Io)
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    #[tokio::test]
    async fn roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = AsyncFrameWriter::new(client);
        let mut reader = AsyncFrameReader::new(server);

        writer.send(b"hello").await.unwrap();
        assert_eq!(reader.read_frame().await.unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn oversized_send_writes_nothing() {
        let cfg = FrameConfig {
            max_frame_size: 2,
            ..FrameConfig::default()
        };
        let mut writer = AsyncFrameWriter::with_config(Vec::<u8>::new(), cfg);
        let err = writer.send(b"abc").await.unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert!(writer.get_ref().is_empty());
    }

    #[tokio::test]
    async fn empty_frame_is_rejected_by_reader() {
        let mut writer = AsyncFrameWriter::new(Vec::<u8>::new());
        writer.send(b"").await.unwrap();

        let mut reader = AsyncFrameReader::new(std::io::Cursor::new(writer.into_inner()));
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::EmptyFrame)
        ));
    }

    #[tokio::test]
    async fn truncated_payload_is_payload_error() {
        let bytes = vec![8u8, 0, 0, 0, b'a', b'b'];
        let mut reader = AsyncFrameReader::new(std::io::Cursor::new(bytes));
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::PayloadRead {
                received: 2,
                expected: 8,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn fragmented_header_fails_in_single_attempt_mode() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&[3, 0]).await.unwrap();

        let mut reader = AsyncFrameReader::new(server);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::HeaderRead { received: 2, .. }));
        assert!(!err.is_disconnect());
    }

    #[tokio::test]
    async fn fragmented_header_is_reassembled_in_exact_mode() {
        let (mut client, server) = tokio::io::duplex(64);
        let cfg = FrameConfig {
            header_read: HeaderReadMode::Exact,
            ..FrameConfig::default()
        };
        let mut reader = AsyncFrameReader::with_config(server, cfg);

        let sender = tokio::spawn(async move {
            client.write_all(&[3, 0]).await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(&[0, 0, b'a', b'b', b'c']).await.unwrap();
            client
        });

        assert_eq!(reader.read_frame().await.unwrap().as_ref(), b"abc");
        drop(sender.await.unwrap());
    }

    #[tokio::test]
    async fn short_header_write_is_header_error() {
        // A 2-byte pipe accepts only half of the header in one write.
        let (client, _server) = tokio::io::duplex(2);
        let mut writer = AsyncFrameWriter::new(client);

        let err = writer.send(b"payload").await.unwrap_err();
        assert!(matches!(err, FrameError::HeaderWrite { written: 2, .. }));
    }

    #[tokio::test]
    async fn interrupted_write_retries() {
        let mut writer = AsyncFrameWriter::new(InterruptedOnce {
            interrupted: false,
            inner: Vec::new(),
        });
        writer.send(b"ok").await.unwrap();
        assert_eq!(writer.get_ref().inner, vec![2, 0, 0, 0, b'o', b'k']);
    }

    struct InterruptedOnce {
        interrupted: bool,
        inner: Vec<u8>,
    }

    impl AsyncWrite for InterruptedOnce {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if !self.interrupted {
                self.interrupted = true;
                return Poll::Ready(Err(std::io::Error::from(ErrorKind::Interrupted)));
            }
            Pin::new(&mut self.inner).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_shutdown(cx)
        }
    }
}
