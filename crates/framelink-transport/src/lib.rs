//! TCP transport layer.
//!
//! Resolves addresses, performs active opens (connect) and passive opens
//! (bind/accept), and hands out the [`FrameStream`] duplex handle that the
//! framing layer reads from and writes to.
//!
//! This is the lowest layer of framelink. It knows nothing about frames.

pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(feature = "async")]
pub mod tokio_tcp;

pub use error::{Result, TransportError};
pub use stream::FrameStream;
pub use tcp::{connect, resolve, TcpAcceptor};
