#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use rustyrelay::config::TlsPaths;
use rustyrelay::log::NoopLogSink;
use rustyrelay::signaling::{Registry, SignalingServer};
use rustyrelay::tls_utils::{build_relay_server_config, load_certs};
use serde_json::{Value, json};
use tungstenite::{Error as WsError, Message, WebSocket};

type TlsClient = WebSocket<StreamOwned<ClientConnection, TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

fn start_tls_relay() -> (SocketAddr, Arc<Registry>) {
    let tls = build_relay_server_config(&TlsPaths {
        cert: fixture("cert.pem"),
        key: fixture("key.pem"),
    })
    .unwrap();
    let server = SignalingServer::bind("127.0.0.1:0", Arc::new(NoopLogSink))
        .unwrap()
        .with_tls(tls);
    assert!(server.is_tls());

    let addr = server.local_addr();
    let registry = server.registry();
    thread::spawn(move || server.run());
    (addr, registry)
}

fn client_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&fixture("ca.pem")).unwrap() {
        roots.add(cert).unwrap();
    }
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

fn connect(addr: SocketAddr, config: &Arc<ClientConfig>) -> TlsClient {
    let tcp = TcpStream::connect(addr).unwrap();
    let name = ServerName::try_from("localhost").unwrap();
    let conn = ClientConnection::new(Arc::clone(config), name).unwrap();
    let url = format!("wss://localhost:{}/", addr.port());
    let (ws, _resp) = tungstenite::client(url, StreamOwned::new(conn, tcp)).unwrap();
    ws
}

fn send(ws: &mut TlsClient, v: Value) {
    ws.send(Message::Text(v.to_string())).unwrap();
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met in {WAIT:?}");
        thread::sleep(Duration::from_millis(10));
    }
}

fn register(ws: &mut TlsClient, registry: &Registry, id: &str, role: &str) {
    send(ws, json!({"type": "register", "id": id, "role": role}));
    wait_until(|| registry.lookup_by_identity(id).is_some());
}

fn recv_within(ws: &mut TlsClient, timeout: Duration) -> Option<Value> {
    ws.get_ref().sock.set_read_timeout(Some(timeout)).unwrap();
    loop {
        match ws.read() {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(_) => continue,
            Err(WsError::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return None;
            }
            Err(e) => panic!("client read failed: {e}"),
        }
    }
}

#[test]
fn directed_and_broadcast_over_wss() {
    let (addr, registry) = start_tls_relay();
    let config = client_config();
    let mut cam = connect(addr, &config);
    let mut viewer = connect(addr, &config);
    register(&mut cam, &registry, "cam", "broadcaster");
    register(&mut viewer, &registry, "viewer", "viewer");

    send(
        &mut cam,
        json!({"target": "viewer", "kind": "offer", "payload": {"sdp": "v=0"}}),
    );
    assert_eq!(
        recv_within(&mut viewer, WAIT),
        Some(json!({"from": "cam", "kind": "offer", "payload": {"sdp": "v=0"}}))
    );

    // The reply travels back while the sender's thread is idling on its poll timeout.
    thread::sleep(QUIET);
    send(&mut viewer, json!({"broadcast": "broadcaster", "kind": "answer", "payload": 1}));
    assert_eq!(
        recv_within(&mut cam, WAIT),
        Some(json!({"from": "viewer", "kind": "answer", "payload": 1}))
    );
    assert_eq!(recv_within(&mut viewer, QUIET), None);
}

#[test]
fn wss_disconnect_removes_the_registration() {
    let (addr, registry) = start_tls_relay();
    let config = client_config();
    let mut a = connect(addr, &config);
    register(&mut a, &registry, "a", "viewer");

    a.close(None).unwrap();
    let _ = a.flush();
    drop(a);

    wait_until(|| registry.is_empty());
}

#[test]
fn plain_client_cannot_register_on_a_tls_listener() {
    let (addr, registry) = start_tls_relay();

    let tcp = TcpStream::connect(addr).unwrap();
    tcp.set_read_timeout(Some(WAIT)).unwrap();
    assert!(tungstenite::client(format!("ws://{addr}/"), tcp).is_err());
    assert!(registry.is_empty());
}
