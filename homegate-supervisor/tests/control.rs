use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

#[path = "../src/child.rs"]
mod child;
#[path = "../src/control.rs"]
mod control;

use child::ChildState;
use control::ControlSocket;

async fn roundtrip(path: &str, command: u8) -> String {
    let mut stream = UnixStream::connect(path).await.unwrap();
    stream.write_all(&[command, 0]).await.unwrap();
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).await.unwrap();
        if byte[0] == 0 {
            break;
        }
        buf.push(byte[0]);
    }
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn stat_reports_both_children_up() {
    let path = format!("/tmp/homegate-supervisor-test-{}.sock", std::process::id());
    let _ = std::fs::remove_file(&path);

    let socket = ControlSocket::bind(&path).unwrap();
    let term_event = Arc::new(AtomicBool::new(false));
    let coap_state = Arc::new(Mutex::new(ChildState::Running));
    let proxy_state = Arc::new(Mutex::new(ChildState::Running));

    let server_term = term_event.clone();
    let server = tokio::spawn(socket.serve(server_term, coap_state, proxy_state));

    let reply = roundtrip(&path, b'3').await;
    assert_eq!(reply, "Proxy: UP\nCoAP Server: UP");

    term_event.store(true, Ordering::SeqCst);
    let _ = tokio::time::timeout(Duration::from_secs(1), server).await;
}

#[tokio::test]
async fn down_sets_the_shared_term_event() {
    let path = format!("/tmp/homegate-supervisor-test-down-{}.sock", std::process::id());
    let _ = std::fs::remove_file(&path);

    let socket = ControlSocket::bind(&path).unwrap();
    let term_event = Arc::new(AtomicBool::new(false));
    let coap_state = Arc::new(Mutex::new(ChildState::Running));
    let proxy_state = Arc::new(Mutex::new(ChildState::Running));

    let server_term = term_event.clone();
    let server = tokio::spawn(socket.serve(server_term, coap_state, proxy_state));

    let reply = roundtrip(&path, b'2').await;
    assert_eq!(reply, "OK");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(term_event.load(Ordering::SeqCst));

    let _ = tokio::time::timeout(Duration::from_secs(1), server).await;
}

#[tokio::test]
async fn up_is_a_no_op_success_reply() {
    let path = format!("/tmp/homegate-supervisor-test-up-{}.sock", std::process::id());
    let _ = std::fs::remove_file(&path);

    let socket = ControlSocket::bind(&path).unwrap();
    let term_event = Arc::new(AtomicBool::new(false));
    let coap_state = Arc::new(Mutex::new(ChildState::Running));
    let proxy_state = Arc::new(Mutex::new(ChildState::Running));

    let server_term = term_event.clone();
    let server = tokio::spawn(socket.serve(server_term, coap_state, proxy_state));

    let reply = roundtrip(&path, b'1').await;
    assert_eq!(reply, "OK");
    assert!(!term_event.load(Ordering::SeqCst));

    term_event.store(true, Ordering::SeqCst);
    let _ = tokio::time::timeout(Duration::from_secs(1), server).await;
}
