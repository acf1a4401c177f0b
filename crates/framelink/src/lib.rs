//! Length-prefixed message framing over TCP.
//!
//! Every message is a 4-byte little-endian length followed by the payload.
//! [`peer::dial`] opens a framed connection; [`peer::Listener`] accepts
//! connections and runs a handler for each one on its own thread.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP resolve/bind/accept/connect
//! - [`frame`]: Wire codec, frame reader and writer
//! - [`peer`]: `Connection`, `Listener`, and the async variants (behind `async`)
//!
//! ```no_run
//! use framelink::peer::{dial, Connection, Listener};
//!
//! let listener = Listener::listen("127.0.0.1:7000", |mut conn: Connection| {
//!     while let Ok(frame) = conn.receive() {
//!         if conn.send(&frame).is_err() {
//!             break;
//!         }
//!     }
//! })?;
//!
//! let mut client = dial("127.0.0.1:7000")?;
//! client.send(b"hello")?;
//! assert_eq!(client.receive()?.as_ref(), b"hello");
//! client.close()?;
//! drop(listener);
//! # Ok::<(), framelink::peer::PeerError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use framelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use framelink_frame::*;
}

/// Re-export connection and listener types.
pub mod peer {
    pub use framelink_peer::*;
}
