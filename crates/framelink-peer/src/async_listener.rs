use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::async_connection::AsyncConnection;
use crate::error::Result;
use crate::listener::ListenerConfig;

/// Async counterpart of [`crate::Listener`]: one tokio task per accepted connection.
///
/// The handler is an async closure. Accept failures end the loop exactly as in
/// the blocking listener.
pub struct AsyncListener {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_loop: Option<JoinHandle<()>>,
}

impl AsyncListener {
    /// Bind `addr` and spawn the accept loop on the current runtime.
    pub async fn listen<F, Fut>(addr: &str, handler: F) -> Result<Self>
    where
        F: Fn(AsyncConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::listen_with_config(addr, handler, ListenerConfig::default()).await
    }

    /// Bind with explicit configuration.
    pub async fn listen_with_config<F, Fut>(
        addr: &str,
        handler: F,
        config: ListenerConfig,
    ) -> Result<Self>
    where
        F: Fn(AsyncConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = framelink_transport::tokio_tcp::bind(addr).await?;
        let local_addr = listener
            .local_addr()
            .map_err(framelink_transport::TransportError::Io)?;
        let shutdown = CancellationToken::new();

        let accept_loop = tokio::spawn(run_accept_loop(
            listener,
            Arc::new(handler),
            config,
            shutdown.clone(),
        ));

        Ok(Self {
            local_addr,
            shutdown,
            accept_loop: Some(accept_loop),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.accept_loop
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop accepting and wait for the loop to drop the socket.
    ///
    /// Handler tasks already spawned keep running.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.accept_loop.take() {
            if let Err(err) = handle.await {
                warn!(addr = %self.local_addr, error = %err, "accept loop task failed");
            }
            info!(addr = %self.local_addr, "listener closed");
        }
    }
}

impl Drop for AsyncListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_accept_loop<F, Fut>(
    listener: TcpListener,
    handler: Arc<F>,
    config: ListenerConfig,
    shutdown: CancellationToken,
) where
    F: Fn(AsyncConnection) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let limit = config.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));

    loop {
        let permit = match &limit {
            Some(semaphore) => {
                let acquired = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = Arc::clone(semaphore).acquire_owned() => permit,
                };
                match acquired {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                }
            }
            None => None,
        };

        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                debug!(error = %err, "accept failed; accept loop exiting");
                break;
            }
        };

        let connection = match AsyncConnection::from_stream(stream, &config.connection) {
            Ok(connection) => connection,
            Err(err) => {
                warn!(%peer, error = %err, "dropping connection; socket setup failed");
                continue;
            }
        };

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let _permit = permit;
            debug!(%peer, "handler started");
            handler(connection).await;
        });
    }

    debug!("accept loop stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn dispatches_connections_to_tasks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut listener = AsyncListener::listen("127.0.0.1:0", move |mut conn| {
            let tx = tx.clone();
            async move {
                if let Ok(frame) = conn.receive().await {
                    let _ = conn.send(&frame).await;
                    let _ = tx.send(frame);
                }
            }
        })
        .await
        .unwrap();
        let addr = listener.local_addr().to_string();

        let mut clients = Vec::new();
        for i in 0..4 {
            let mut conn = AsyncConnection::dial(&addr).await.unwrap();
            conn.send(format!("task-{i}").as_bytes()).await.unwrap();
            clients.push(conn);
        }
        for (i, conn) in clients.iter_mut().enumerate() {
            let echoed = conn.receive().await.unwrap();
            assert_eq!(echoed.as_ref(), format!("task-{i}").as_bytes());
        }

        let mut seen = Vec::new();
        for _ in 0..4 {
            let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(frame);
        }
        assert_eq!(seen.len(), 4);

        listener.close().await;
    }

    #[tokio::test]
    async fn close_refuses_new_connections() {
        let mut listener = AsyncListener::listen("127.0.0.1:0", |_conn| async {})
            .await
            .unwrap();
        let addr = listener.local_addr().to_string();
        assert!(listener.is_running());

        listener.close().await;
        assert!(!listener.is_running());
        assert!(AsyncConnection::dial(&addr).await.is_err());
    }

    #[tokio::test]
    async fn max_in_flight_limits_concurrent_handlers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = ListenerConfig {
            max_in_flight: Some(1),
            ..ListenerConfig::default()
        };
        let mut listener = AsyncListener::listen_with_config(
            "127.0.0.1:0",
            move |mut conn: AsyncConnection| {
                let tx = tx.clone();
                async move {
                    if let Ok(frame) = conn.receive().await {
                        let _ = tx.send(frame);
                        // Hold the slot until the client hangs up.
                        let _ = conn.receive().await;
                    }
                }
            },
            config,
        )
        .await
        .unwrap();
        let addr = listener.local_addr().to_string();

        let mut first = AsyncConnection::dial(&addr).await.unwrap();
        first.send(b"first").await.unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_ref(), b"first");

        let mut second = AsyncConnection::dial(&addr).await.unwrap();
        second.send(b"second").await.unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_err());

        first.close().await.unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_ref(), b"second");

        second.close().await.unwrap();
        listener.close().await;
    }
}
