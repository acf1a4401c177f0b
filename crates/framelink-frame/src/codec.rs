use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: a single little-endian `u32` payload length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size: 1 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// How the reader obtains the 4-byte header from the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderReadMode {
    /// Exactly one read call; anything other than 4 bytes is a header error.
    ///
    /// A transport that splits the header across segments surfaces as a
    /// spurious [`FrameError::HeaderRead`].
    #[default]
    SingleAttempt,
    /// Keep reading until all 4 header bytes have arrived or the stream ends.
    Exact,
}

/// Configuration shared by frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes, enforced on send and receive. Default: 1 MiB.
    pub max_frame_size: usize,
    /// Header read strategy. Default: [`HeaderReadMode::SingleAttempt`].
    pub header_read: HeaderReadMode,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            header_read: HeaderReadMode::default(),
        }
    }
}

/// Encode the length header for a payload of `len` bytes.
///
/// A zero length is encoded as-is; the receiving side will reject it with
/// [`FrameError::EmptyFrame`].
pub fn encode_header(len: usize, max_frame_size: usize) -> Result<[u8; HEADER_SIZE]> {
    let max = max_frame_size.min(u32::MAX as usize);
    if len > max {
        return Err(FrameError::FrameTooLarge { size: len, max });
    }
    Ok((len as u32).to_le_bytes())
}

/// Decode and validate a length header.
pub fn decode_header(header: [u8; HEADER_SIZE], max_frame_size: usize) -> Result<usize> {
    let len = u32::from_le_bytes(header) as usize;
    if len == 0 {
        return Err(FrameError::EmptyFrame);
    }
    if len > max_frame_size {
        return Err(FrameError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }
    Ok(len)
}

/// Encode a complete frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────────┐
/// │ Length (4B LE) │ Payload          │
/// │ 0 < n <= max   │ (Length bytes)   │
/// └────────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], max_frame_size: usize, dst: &mut BytesMut) -> Result<()> {
    let header = encode_header(payload.len(), max_frame_size)?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&src[..HEADER_SIZE]);
    let len = decode_header(header, max_frame_size)?;

    if src.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(len).freeze()))
}
