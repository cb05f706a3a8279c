use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use rustls::{ServerConnection, StreamOwned};
use tungstenite::protocol::Role;
use tungstenite::{Error as WsError, Message, WebSocket};

use crate::log::log_sink::LogSink;
use crate::signaling::channel::{OUTBOUND_QUEUE_CAP, PeerChannel};
use crate::signaling::http::{self, HttpOutcome};
use crate::signaling::router::Router;
use crate::signaling::session::ConnectionSession;
use crate::signaling::types::ConnectionId;
use crate::{sink_debug, sink_info, sink_warn};

/// How long a connection thread blocks on its socket before checking its
/// outbound queue again. Bounds the added latency of a forwarded frame.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A socket a connection thread can both read and write, with a read timeout
/// so one thread can serve both directions.
pub trait PollableStream: Read + Write + Send {
    fn set_poll_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl PollableStream for TcpStream {
    fn set_poll_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

impl PollableStream for StreamOwned<ServerConnection, TcpStream> {
    fn set_poll_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.sock.set_read_timeout(timeout)
    }
}

/// Why a connection loop ended.
#[derive(Debug)]
enum LoopEnd {
    Closed,
    Error(WsError),
}

/// Serves one accepted connection to completion. Runs on its own thread.
///
/// 1. Answers the opening HTTP request (upgrade, test page or 404).
/// 2. After an upgrade, opens a [`ConnectionSession`] whose channel feeds this
///    thread's outbound queue.
/// 3. Alternates between draining that queue to the socket and reading
///    frames into the session until the peer goes away.
/// 4. Closes the session, which unregisters the connection.
pub fn serve_connection<S: PollableStream>(
    mut stream: S,
    conn_id: ConnectionId,
    router: Arc<Router>,
    serve_test_page: bool,
    log: Arc<dyn LogSink>,
) {
    let buffered = match http::accept(&mut stream, serve_test_page) {
        Ok(HttpOutcome::Upgraded { path, buffered }) => {
            sink_debug!(log, "conn {} upgraded to WebSocket on {}", conn_id, path);
            buffered
        }
        Ok(HttpOutcome::Served { status, path }) => {
            sink_info!(log, "conn {} HTTP {} -> {}", conn_id, path, status);
            return;
        }
        Err(e) => {
            sink_warn!(log, "conn {} handshake failed: {}", conn_id, e);
            return;
        }
    };

    if let Err(e) = stream.set_poll_timeout(Some(POLL_INTERVAL)) {
        sink_warn!(log, "conn {} cannot set poll timeout: {}", conn_id, e);
        return;
    }

    let ws = WebSocket::from_partially_read(stream, buffered, Role::Server, None);
    let (channel, rx) = PeerChannel::bounded(conn_id, OUTBOUND_QUEUE_CAP);
    let session = ConnectionSession::open(channel, router, log.clone());

    run_ws_loop(ws, session, rx, log);
}

fn run_ws_loop<S: Read + Write>(
    mut ws: WebSocket<S>,
    mut session: ConnectionSession,
    outbound: Receiver<String>,
    log: Arc<dyn LogSink>,
) {
    let conn_id = session.conn_id();

    let end = loop {
        if let Err(e) = flush_outbound(&mut ws, &outbound, conn_id, &log) {
            break LoopEnd::Error(e);
        }

        match ws.read() {
            Ok(Message::Text(text)) => {
                session.on_text(&text);
            }
            Ok(Message::Binary(bytes)) => {
                session.on_binary(&bytes);
            }
            Ok(Message::Close(frame)) => {
                // tungstenite queues the close reply; the next read reports ConnectionClosed.
                sink_debug!(log, "conn {} sent close: {:?}", conn_id, frame);
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
            Err(WsError::Io(e)) if is_poll_timeout(&e) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break LoopEnd::Closed,
            Err(e) => break LoopEnd::Error(e),
        }
    };

    match end {
        LoopEnd::Closed => sink_debug!(log, "conn {} closed by peer", conn_id),
        LoopEnd::Error(e) => sink_warn!(log, "conn {} transport error: {}", conn_id, e),
    }
    session.close();
}

/// Writes every queued frame, then flushes.
///
/// A frame the socket cannot take right now stays buffered inside tungstenite;
/// a frame that would overflow the write buffer is dropped and logged.
fn flush_outbound<S: Read + Write>(
    ws: &mut WebSocket<S>,
    outbound: &Receiver<String>,
    conn_id: ConnectionId,
    log: &Arc<dyn LogSink>,
) -> Result<(), WsError> {
    loop {
        match outbound.try_recv() {
            Ok(frame) => match ws.write(Message::Text(frame)) {
                Ok(()) => {}
                Err(WsError::Io(e)) if is_poll_timeout(&e) => {}
                Err(WsError::WriteBufferFull(_)) => {
                    sink_warn!(log, "conn {} write buffer full; frame dropped", conn_id);
                }
                Err(e) => return Err(e),
            },
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
        }
    }

    match ws.flush() {
        Err(WsError::Io(e)) if is_poll_timeout(&e) => Ok(()),
        other => other,
    }
}

/// A read timeout surfaces as `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_poll_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
