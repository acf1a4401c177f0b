//! Framed connections and the listener that hands them out.
//!
//! [`dial`] opens a [`Connection`] to a remote address. [`Listener::listen`]
//! binds an address and dispatches every accepted connection to a
//! [`Handler`] on its own thread, without waiting for earlier handlers to
//! finish.
//!
//! Failed sends and receives leave a connection mid-frame; close it rather
//! than retrying.

mod admission;
pub mod connection;
pub mod connector;
pub mod error;
pub mod handler;
pub mod listener;

#[cfg(feature = "async")]
pub mod async_connection;
#[cfg(feature = "async")]
pub mod async_listener;

pub use connection::{Connection, ConnectionConfig, ConnectionReader, ConnectionWriter};
pub use connector::{dial, dial_with_config};
pub use error::{PeerError, Result};
pub use framelink_frame::{FrameConfig, HeaderReadMode, DEFAULT_MAX_FRAME_SIZE};
pub use handler::Handler;
pub use listener::{Listener, ListenerConfig};

#[cfg(feature = "async")]
pub use async_connection::AsyncConnection;
#[cfg(feature = "async")]
pub use async_listener::AsyncListener;
