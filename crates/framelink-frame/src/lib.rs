//! Length-prefixed message framing.
//!
//! Every message on the wire is a 4-byte little-endian unsigned length
//! followed by exactly that many payload bytes. There is no magic, no type
//! tag and no checksum; the payload is opaque to this layer.
//!
//! A declared length of zero is rejected on receive, and any length above the
//! configured maximum is rejected on both send and receive.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_io;
#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    decode_frame, decode_header, encode_frame, encode_header, FrameConfig, HeaderReadMode,
    DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_io::{AsyncFrameReader, AsyncFrameWriter};
#[cfg(feature = "async")]
pub use tokio_codec::FrameCodec;
