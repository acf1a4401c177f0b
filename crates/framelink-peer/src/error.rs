/// Errors that can occur on framed connections and listeners.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Setup-time or socket-level error (resolve, bind, connect, accept, shutdown).
    #[error("transport error: {0}")]
    Transport(#[from] framelink_transport::TransportError),

    /// Per-frame send or receive error.
    #[error("frame error: {0}")]
    Frame(#[from] framelink_frame::FrameError),

    /// The listener could not start its accept loop.
    #[error("failed to spawn accept loop: {0}")]
    Spawn(std::io::Error),
}

impl PeerError {
    /// True when the remote end closed the connection cleanly between frames.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, PeerError::Frame(err) if err.is_disconnect())
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
