use std::net::{SocketAddr, TcpStream};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use framelink_transport::TcpAcceptor;
use tracing::{debug, info, warn};

use crate::admission::Admission;
use crate::connection::{Connection, ConnectionConfig};
use crate::error::{PeerError, Result};
use crate::handler::Handler;

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Listener behavior.
#[derive(Debug, Clone, Default)]
pub struct ListenerConfig {
    /// Applied to every accepted connection.
    pub connection: ConnectionConfig,
    /// Upper bound on concurrently running handlers. `None` is unbounded.
    ///
    /// When the bound is reached the accept loop stops accepting until a
    /// handler returns; pending clients wait in the OS backlog.
    pub max_in_flight: Option<usize>,
}

/// Accepts TCP connections and hands each one to a [`Handler`] on its own thread.
///
/// The accept loop starts inside [`Listener::listen`]. A failing accept ends
/// the loop for good; there is no retry and no error is reported beyond a
/// debug log line. [`Listener::close`] stops the loop and releases the socket,
/// but does not wait for or cancel handlers that are already running.
///
/// Dropping a `Listener` calls `close`, so the drop blocks until the accept
/// thread has exited. That includes a loopback wake-up connect of up to one
/// second. Call `close` explicitly from a thread that can afford the wait.
pub struct Listener {
    local_addr: SocketAddr,
    wake_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    admission: Arc<Admission>,
    accept_loop: Option<JoinHandle<()>>,
}

impl Listener {
    /// Bind `addr` and start dispatching connections to `handler`.
    pub fn listen<H: Handler>(addr: &str, handler: H) -> Result<Self> {
        Self::listen_with_config(addr, handler, ListenerConfig::default())
    }

    /// Bind with explicit configuration.
    pub fn listen_with_config<H: Handler>(
        addr: &str,
        handler: H,
        config: ListenerConfig,
    ) -> Result<Self> {
        let acceptor = TcpAcceptor::bind(addr)?;
        let local_addr = acceptor.local_addr();
        let wake_addr = acceptor.loopback_addr();

        let closed = Arc::new(AtomicBool::new(false));
        let admission = Admission::new(config.max_in_flight);

        let accept_loop = AcceptLoop {
            acceptor,
            handler: Arc::new(handler),
            config: config.connection,
            closed: Arc::clone(&closed),
            admission: Arc::clone(&admission),
            next_id: 1,
        };
        let handle = std::thread::Builder::new()
            .name(format!("framelink-accept-{}", local_addr.port()))
            .spawn(move || accept_loop.run())
            .map_err(PeerError::Spawn)?;

        Ok(Self {
            local_addr,
            wake_addr,
            closed,
            admission,
            accept_loop: Some(handle),
        })
    }

    /// The bound address (with the OS-assigned port when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the accept loop is still running.
    pub fn is_running(&self) -> bool {
        self.accept_loop
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of handlers currently running.
    pub fn in_flight(&self) -> usize {
        self.admission.in_flight()
    }

    /// Stop accepting and release the bound socket.
    ///
    /// Returns once the accept loop has exited, so connection attempts made
    /// afterwards are refused. Running handlers keep their connections.
    /// Calling `close` more than once is a no-op.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.admission.close();

        // Unblock the pending accept with a throwaway connection. If the loop
        // already died this is refused, which is fine.
        if let Err(err) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            debug!(error = %err, "accept loop wake-up connect failed");
        }

        if let Some(handle) = self.accept_loop.take() {
            if handle.join().is_err() {
                warn!(addr = %self.local_addr, "accept loop panicked");
            }
        }
        info!(addr = %self.local_addr, "listener closed");
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.local_addr)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

struct AcceptLoop<H> {
    acceptor: TcpAcceptor,
    handler: Arc<H>,
    config: ConnectionConfig,
    closed: Arc<AtomicBool>,
    admission: Arc<Admission>,
    next_id: u64,
}

impl<H: Handler> AcceptLoop<H> {
    fn run(mut self) {
        let addr = self.acceptor.local_addr();
        debug!(%addr, "accept loop started");

        loop {
            let Some(permit) = self.admission.acquire() else {
                break;
            };

            let (stream, peer) = match self.acceptor.accept() {
                Ok(accepted) => accepted,
                Err(err) => {
                    debug!(%addr, error = %err, "accept failed; accept loop exiting");
                    break;
                }
            };

            if self.closed.load(Ordering::SeqCst) {
                break;
            }

            let connection = match Connection::from_stream(stream, &self.config) {
                Ok(connection) => connection,
                Err(err) => {
                    warn!(%peer, error = %err, "dropping connection; socket setup failed");
                    continue;
                }
            };

            let id = self.next_id;
            self.next_id += 1;
            let handler = Arc::clone(&self.handler);
            let spawned = std::thread::Builder::new()
                .name(format!("framelink-conn-{id}"))
                .spawn(move || {
                    let _permit = permit;
                    debug!(%peer, id, "handler started");
                    if catch_unwind(AssertUnwindSafe(|| handler.accept(connection))).is_err() {
                        warn!(%peer, id, "handler panicked");
                    }
                });
            if let Err(err) = spawned {
                warn!(%peer, error = %err, "dropping connection; handler thread spawn failed");
            }
        }

        debug!(%addr, "accept loop stopped");
    }
}
