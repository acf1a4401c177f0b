use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use framelink_peer::{Connection, Listener, ListenerConfig};

use crate::cmd::{install_ctrlc_handler, ListenArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat, ReceivedFrame};
use crate::store::{ensure_dir, store_payload};

#[derive(Debug, Clone)]
enum Event {
    Frame(ReceivedFrame),
    Interrupted,
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(dir) = &args.out_dir {
        ensure_dir(dir)?;
    }

    let (tx, rx) = mpsc::channel();
    install_ctrlc_handler(tx.clone(), Event::Interrupted)?;

    let config = ListenerConfig {
        connection: args.frame.connection_config(),
        ..ListenerConfig::default()
    };
    let mut listener = Listener::listen_with_config(&args.addr, forward_frames(tx), config)
        .map_err(|err| peer_error("bind failed", err))?;
    tracing::info!(addr = %listener.local_addr(), "listening");

    let mut printed = 0usize;
    while let Ok(event) = rx.recv() {
        let frame = match event {
            Event::Frame(frame) => frame,
            Event::Interrupted => break,
        };

        if let Some(dir) = &args.out_dir {
            store_payload(dir, frame.seq, &frame.payload)?;
        }
        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    listener.close();
    Ok(SUCCESS)
}

/// Build a handler that forwards every received frame to `tx`.
///
/// Sequence numbers are shared across connections, so they reflect the
/// order frames arrived at this process.
fn forward_frames(tx: mpsc::Sender<Event>) -> impl Fn(Connection) + Send + Sync + 'static {
    let next_seq = AtomicU64::new(1);
    move |mut conn: Connection| {
        let peer = conn.peer_addr();
        let accepted = Instant::now();
        tracing::debug!(?peer, "connection accepted");

        loop {
            let payload = match conn.receive() {
                Ok(payload) => payload,
                Err(err) if err.is_disconnect() => break,
                Err(err) => {
                    tracing::warn!(?peer, error = %err, "receive failed; dropping connection");
                    break;
                }
            };
            let frame = ReceivedFrame {
                peer,
                seq: next_seq.fetch_add(1, Ordering::SeqCst),
                payload,
                elapsed: accepted.elapsed(),
            };
            if tx.send(Event::Frame(frame)).is_err() {
                break;
            }
        }
    }
}
