use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_header, FrameConfig, HeaderReadMode, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// The payload is read in a loop until the declared length arrives, so callers
/// never see a truncated message. How the header is read depends on
/// [`FrameConfig::header_read`].
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame payload (blocking).
    pub fn read_frame(&mut self) -> Result<Bytes> {
        let header = self.read_header()?;
        let len = decode_header(header, self.config.max_frame_size)?;
        trace!(len, "frame header read");

        let mut payload = BytesMut::zeroed(len);
        let mut received = 0usize;
        while received < len {
            match self.inner.read(&mut payload[received..]) {
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

    fn read_header(&mut self) -> Result<[u8; HEADER_SIZE]> {
        let mut header = [0u8; HEADER_SIZE];
        let mut received = 0usize;
        loop {
            let n = match self.inner.read(&mut header[received..]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(FrameError::HeaderRead {
                        received,
                        source: err,
                    })
                }
            };
            received += n;

            if received == HEADER_SIZE {
                return Ok(header);
            }
            if n == 0 || self.config.header_read == HeaderReadMode::SingleAttempt {
                return Err(FrameError::HeaderRead {
                    received,
                    source: std::io::Error::new(ErrorKind::UnexpectedEof, "short frame header"),
                });
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum frame size for subsequent reads.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, DEFAULT_MAX_FRAME_SIZE};

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, DEFAULT_MAX_FRAME_SIZE, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"hello"])));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames_in_order() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"one", b"two", b"three"])));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"three");
    }

    #[test]
    fn read_frame_at_max_size() {
        let payload = vec![0xAB; 64];
        let cfg = FrameConfig {
            max_frame_size: 64,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire(&[&payload])), cfg);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), payload.as_slice());
    }

    #[test]
    fn payload_partial_reads_are_reassembled() {
        let mut reader = FrameReader::new(ChunkedReader::new(wire(&[b"slow payload"]), 4, 1));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), b"slow payload");
    }

    #[test]
    fn fragmented_header_fails_in_single_attempt_mode() {
        let mut reader = FrameReader::new(ChunkedReader::new(wire(&[b"abc"]), 2, 2));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::HeaderRead { received: 2, .. }));
    }

    #[test]
    fn fragmented_header_is_reassembled_in_exact_mode() {
        let cfg = FrameConfig {
            header_read: HeaderReadMode::Exact,
            ..FrameConfig::default()
        };
        let mut reader =
            FrameReader::with_config(ChunkedReader::new(wire(&[b"abc"]), 1, 1), cfg);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), b"abc");
    }

    #[test]
    fn exact_mode_reports_eof_inside_header() {
        let cfg = FrameConfig {
            header_read: HeaderReadMode::Exact,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(vec![0x05, 0x00]), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::HeaderRead { received: 2, .. }));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn clean_close_between_frames_is_a_disconnect() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::HeaderRead { received: 0, .. }));
        assert!(err.is_disconnect());
    }

    #[test]
    fn zero_length_header_is_empty_frame() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8; 4]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::EmptyFrame));
    }

    #[test]
    fn oversized_header_does_not_consume_payload() {
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(1024);
        bytes.put_slice(&[0u8; 32]);

        let cfg = FrameConfig {
            max_frame_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 1024, max: 16 }));
        assert_eq!(reader.get_ref().position(), HEADER_SIZE as u64);
    }

    #[test]
    fn connection_closed_mid_payload() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(16);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadRead {
                received: 9,
                expected: 16,
                ..
            }
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedOnce {
            interrupted: false,
            inner: Cursor::new(wire(&[b"ok"])),
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn set_max_frame_size_applies_to_next_read() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"12345678", b"12345678"])));
        assert!(reader.read_frame().is_ok());

        reader.set_max_frame_size(4);
        assert_eq!(reader.config().max_frame_size, 4);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 8, max: 4 }));
    }

    #[test]
    fn roundtrip_over_tcp() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            let stream = std::net::TcpStream::connect(addr).unwrap();
            let mut writer = crate::writer::FrameWriter::new(stream);
            writer.send(b"ping").unwrap();
            writer.send(b"pong").unwrap();
        });

        let (stream, _) = listener.accept().unwrap();
        let mut reader = FrameReader::new(stream);
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"ping");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"pong");

        client.join().unwrap();
    }

    /// Serves the header in `header_chunk`-sized reads and the rest in `body_chunk`-sized reads.
    struct ChunkedReader {
        bytes: Vec<u8>,
        pos: usize,
        header_chunk: usize,
        body_chunk: usize,
    }

    impl ChunkedReader {
        fn new(bytes: Vec<u8>, header_chunk: usize, body_chunk: usize) -> Self {
            Self {
                bytes,
                pos: 0,
                header_chunk,
                body_chunk,
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            let chunk = if self.pos < HEADER_SIZE {
                self.header_chunk.min(HEADER_SIZE - self.pos)
            } else {
                self.body_chunk
            };
            let n = chunk.min(buf.len()).min(self.bytes.len() - self.pos);
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
