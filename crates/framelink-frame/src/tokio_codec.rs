//! `tokio_util::codec` integration.
//!
//! Unlike [`crate::FrameReader`], the decoder buffers input, so a header that
//! arrives split across reads is reassembled rather than rejected.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE};
use crate::error::FrameError;

/// Length-prefixed frame codec for `Framed`, `FramedRead` and `FramedWrite`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Codec with the default 1 MiB limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Codec with an explicit frame size limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Current frame size limit.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_frame(src, self.max_frame_size)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if src.len() >= HEADER_SIZE {
                    let mut header = [0u8; HEADER_SIZE];
                    header.copy_from_slice(&src[..HEADER_SIZE]);
                    let len = u32::from_le_bytes(header) as usize;
                    src.reserve(HEADER_SIZE + len - src.len());
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.as_ref(), self.max_frame_size, dst)
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item, self.max_frame_size, dst)
    }
}
