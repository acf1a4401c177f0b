//! Minimal echo server: every connection gets its own thread and echoes
//! frames back until the client hangs up.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send 127.0.0.1:7070 --data hello --wait

use std::sync::mpsc;

use framelink::peer::{Connection, Listener};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut listener = Listener::listen("127.0.0.1:7070", |mut conn: Connection| {
        eprintln!("Peer connected: {:?}", conn.peer_addr());
        loop {
            match conn.receive() {
                Ok(frame) => {
                    eprintln!("Received {} bytes", frame.len());
                    if conn.send(&frame).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Peer disconnected: {e}");
                    break;
                }
            }
        }
    })?;
    eprintln!("Listening on {}", listener.local_addr());

    // Serve until stdin closes.
    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = std::io::stdin().read_line(&mut String::new());
        let _ = done_tx.send(());
    });
    let _ = done_rx.recv();

    listener.close();
    Ok(())
}
