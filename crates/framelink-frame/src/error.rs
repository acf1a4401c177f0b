use crate::codec::HEADER_SIZE;

/// Errors that can occur while sending or receiving frames.
///
/// Any error other than [`FrameError::FrameTooLarge`] on the send side leaves
/// the stream at an unknown position inside a frame. The connection cannot be
/// resynchronized and must be closed.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload length exceeds the configured maximum frame size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The length header could not be written in a single write.
    #[error("failed to write frame header ({written} of {} bytes): {source}", HEADER_SIZE)]
    HeaderWrite {
        written: usize,
        source: std::io::Error,
    },

    /// The payload could not be written in full.
    #[error("failed to write frame payload ({written} of {total} bytes): {source}")]
    PayloadWrite {
        written: usize,
        total: usize,
        source: std::io::Error,
    },

    /// The length header could not be read in full.
    #[error("failed to read frame header ({received} of {} bytes): {source}", HEADER_SIZE)]
    HeaderRead {
        received: usize,
        source: std::io::Error,
    },

    /// The peer declared a zero-length frame, which the protocol cannot represent.
    #[error("empty frame (declared length 0)")]
    EmptyFrame,

    /// The payload ended or failed before the declared length was reached.
    #[error("failed to read frame payload ({received} of {expected} bytes): {source}")]
    PayloadRead {
        received: usize,
        expected: usize,
        source: std::io::Error,
    },

    /// An I/O error outside of a frame boundary (e.g. codec end-of-stream).
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True when the peer closed the stream cleanly between frames.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            FrameError::HeaderRead { received: 0, source }
                if source.kind() == std::io::ErrorKind::UnexpectedEof
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
