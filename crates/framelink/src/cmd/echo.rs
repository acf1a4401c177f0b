use std::sync::mpsc;
use std::time::Instant;

use framelink_peer::{Connection, Listener, ListenerConfig};

use crate::cmd::{install_ctrlc_handler, EchoArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let config = ListenerConfig {
        connection: args.frame.connection_config(),
        max_in_flight: args.max_in_flight,
    };
    let (stop_tx, stop_rx) = mpsc::channel();
    install_ctrlc_handler(stop_tx, ())?;

    let mut listener = Listener::listen_with_config(&args.addr, echo_connection, config)
        .map_err(|err| peer_error("bind failed", err))?;
    tracing::info!(addr = %listener.local_addr(), "echo server listening");

    let _ = stop_rx.recv();
    listener.close();

    Ok(SUCCESS)
}

/// Echo every frame back until the peer goes away.
fn echo_connection(mut conn: Connection) {
    let peer = conn.peer_addr();
    let accepted = Instant::now();
    let mut echoed = 0u64;

    loop {
        let frame = match conn.receive() {
            Ok(frame) => frame,
            Err(err) if err.is_disconnect() => break,
            Err(err) => {
                tracing::warn!(?peer, error = %err, "receive failed; dropping connection");
                break;
            }
        };

        tracing::info!(?peer, size = frame.len(), "echoing frame");
        if let Err(err) = conn.send(&frame) {
            tracing::warn!(?peer, error = %err, "echo send failed; dropping connection");
            break;
        }
        echoed += 1;
    }

    tracing::debug!(
        ?peer,
        frames = echoed,
        elapsed_ms = accepted.elapsed().as_millis() as u64,
        "connection finished"
    );
    let _ = conn.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelink_peer::dial;

    #[test]
    fn echoes_frames_until_disconnect() {
        let mut listener = Listener::listen("127.0.0.1:0", echo_connection).unwrap();
        let mut client = dial(&listener.local_addr().to_string()).unwrap();

        for payload in [&b"one"[..], &b"two"[..], &[0u8, 1, 2, 255][..]] {
            client.send(payload).unwrap();
            assert_eq!(client.receive().unwrap().as_ref(), payload);
        }

        client.close().unwrap();
        listener.close();
    }

    #[test]
    fn oversized_frame_drops_the_connection() {
        let mut config = ListenerConfig::default();
        config.connection.frame.max_frame_size = 4;
        let mut listener =
            Listener::listen_with_config("127.0.0.1:0", echo_connection, config).unwrap();

        let mut client = dial(&listener.local_addr().to_string()).unwrap();
        client.send(b"too long").unwrap();
        assert!(client.receive().is_err());

        listener.close();
    }
}
