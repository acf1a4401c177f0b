use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use framelink_peer::{dial, Connection, Listener, PeerError};
use framelink_transport::TransportError;

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

fn echo_once(mut conn: Connection) -> Option<Vec<u8>> {
    let frame = conn.receive().ok()?;
    conn.send(&frame).ok()?;
    Some(frame.to_vec())
}

#[test]
fn fan_out_dispatches_each_client_to_its_own_handler() {
    const CLIENTS: usize = 16;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let listener = {
        let calls = Arc::clone(&calls);
        let seen = Arc::clone(&seen);
        Listener::listen("127.0.0.1:0", move |conn: Connection| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(frame) = echo_once(conn) {
                seen.lock().unwrap().push(frame);
            }
        })
        .expect("listener should bind")
    };
    let addr = listener.local_addr().to_string();

    let clients: Vec<_> = (0..CLIENTS)
        .map(|i| {
            let addr = addr.clone();
            thread::spawn(move || {
                let payload = format!("client-{i}").into_bytes();
                let mut conn = dial(&addr).expect("client should connect");
                conn.send(&payload).expect("client should send");
                let echoed = conn.receive().expect("client should receive echo");
                assert_eq!(echoed.as_ref(), payload.as_slice());
                let _ = conn.close();
            })
        })
        .collect();

    for client in clients {
        client.join().expect("client thread should finish");
    }

    // Handlers finish after the echo; give the last ones a moment to record.
    let deadline = std::time::Instant::now() + RECV_TIMEOUT;
    while seen.lock().unwrap().len() < CLIENTS && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(calls.load(Ordering::SeqCst), CLIENTS);
    let seen: HashSet<Vec<u8>> = seen.lock().unwrap().iter().cloned().collect();
    let expected: HashSet<Vec<u8>> = (0..CLIENTS)
        .map(|i| format!("client-{i}").into_bytes())
        .collect();
    assert_eq!(seen, expected);
}

#[test]
fn close_refuses_new_connections() {
    let mut listener =
        Listener::listen("127.0.0.1:0", |_conn: Connection| {}).expect("listener should bind");
    let addr = listener.local_addr().to_string();

    let _before = dial(&addr).expect("connect before close should succeed");

    listener.close();
    assert!(!listener.is_running());

    let err = dial(&addr).expect_err("connect after close should fail");
    assert!(matches!(
        err,
        PeerError::Transport(TransportError::Connect { .. })
    ));
}

#[test]
fn close_leaves_in_flight_handlers_running() {
    let (started_tx, started_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();

    let mut listener = Listener::listen("127.0.0.1:0", move |mut conn: Connection| {
        started_tx.send(()).unwrap();
        let mut count = 0usize;
        while let Ok(frame) = conn.receive() {
            if conn.send(&frame).is_err() {
                break;
            }
            count += 1;
        }
        done_tx.send(count).unwrap();
    })
    .expect("listener should bind");

    let mut client = dial(&listener.local_addr().to_string()).expect("client should connect");
    client.send(b"before close").unwrap();
    assert_eq!(client.receive().unwrap().as_ref(), b"before close");
    started_rx.recv_timeout(RECV_TIMEOUT).unwrap();

    listener.close();

    client.send(b"after close").unwrap();
    assert_eq!(client.receive().unwrap().as_ref(), b"after close");
    client.close().unwrap();

    assert_eq!(done_rx.recv_timeout(RECV_TIMEOUT).unwrap(), 2);
}

#[test]
fn listen_on_bound_port_is_bind_error() {
    let first = Listener::listen("127.0.0.1:0", |_conn: Connection| {}).unwrap();
    let err = Listener::listen(&first.local_addr().to_string(), |_conn: Connection| {})
        .expect_err("second bind should fail");
    assert!(matches!(err, PeerError::Transport(TransportError::Bind { .. })));
}

#[test]
fn listen_on_unresolvable_address_is_address_error() {
    let err = Listener::listen("nowhere", |_conn: Connection| {})
        .expect_err("bad address should fail");
    assert!(matches!(
        err,
        PeerError::Transport(TransportError::Address { .. })
    ));
}
