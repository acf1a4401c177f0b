//! Async echo server on tokio: one task per connection.
//!
//! Run with:
//!   cargo run --example async-echo-server --features async
//!
//! Stop with Ctrl-C.

use framelink::peer::{AsyncConnection, AsyncListener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut listener = AsyncListener::listen("127.0.0.1:7071", |mut conn: AsyncConnection| async move {
        while let Ok(frame) = conn.receive().await {
            if conn.send(&frame).await.is_err() {
                break;
            }
        }
        let _ = conn.close().await;
    })
    .await?;
    eprintln!("Listening on {}", listener.local_addr());

    tokio::signal::ctrl_c().await?;
    listener.close().await;
    Ok(())
}
