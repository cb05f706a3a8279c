use std::sync::Arc;

use crate::log::log_sink::LogSink;
use crate::signaling::channel::PeerChannel;
use crate::signaling::protocol::{InboundMsg, ProtoError, codec::decode_inbound_bytes, decode_inbound};
use crate::signaling::router::{RouteOutcome, Router};
use crate::signaling::types::{ConnectionId, Identity};
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

/// Connection-local routing state: its own channel and, once registered, its identity.
#[derive(Debug)]
pub struct PeerState {
    channel: PeerChannel,
    identity: Option<Identity>,
}

impl PeerState {
    pub fn new(channel: PeerChannel) -> Self {
        Self {
            channel,
            identity: None,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.channel.conn_id()
    }

    /// `None` until the connection sends a valid `register`.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn channel(&self) -> &PeerChannel {
        &self.channel
    }

    pub(crate) fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    fn take_identity(&mut self) -> Option<Identity> {
        self.identity.take()
    }
}

/// Lifecycle of one connection as seen by the core.
///
/// Created when the transport accepts a connection, fed every inbound frame,
/// and closed exactly once. Closing (explicitly or on drop) removes the
/// connection's registry entry if it still owns it.
pub struct ConnectionSession {
    peer: PeerState,
    router: Arc<Router>,
    log: Arc<dyn LogSink>,
    closed: bool,
}

impl ConnectionSession {
    pub fn open(channel: PeerChannel, router: Arc<Router>, log: Arc<dyn LogSink>) -> Self {
        sink_info!(log, "new connection {}", channel.conn_id());
        Self {
            peer: PeerState::new(channel),
            router,
            log,
            closed: false,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.peer.conn_id()
    }

    pub fn identity(&self) -> Option<&str> {
        self.peer.identity()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Handles one text frame. Returns `None` if it was discarded or a no-op.
    pub fn on_text(&mut self, text: &str) -> Option<RouteOutcome> {
        sink_trace!(self.log, "conn {} received: {}", self.conn_id(), text);
        let decoded = decode_inbound(text);
        self.on_decoded(decoded)
    }

    /// Handles one binary frame; accepted only if it is UTF-8 JSON.
    pub fn on_binary(&mut self, bytes: &[u8]) -> Option<RouteOutcome> {
        sink_trace!(
            self.log,
            "conn {} received {} binary bytes",
            self.conn_id(),
            bytes.len()
        );
        let decoded = decode_inbound_bytes(bytes);
        self.on_decoded(decoded)
    }

    fn on_decoded(
        &mut self,
        decoded: Result<Option<InboundMsg>, ProtoError>,
    ) -> Option<RouteOutcome> {
        if self.closed {
            return None;
        }
        match decoded {
            Ok(Some(msg)) => Some(self.router.dispatch(&mut self.peer, msg)),
            Ok(None) => {
                sink_debug!(
                    self.log,
                    "conn {}: frame has no register/target/broadcast; ignored",
                    self.conn_id()
                );
                None
            }
            Err(e) => {
                sink_warn!(self.log, "conn {}: discarded frame: {}", self.conn_id(), e);
                None
            }
        }
    }

    /// Tears the session down. Safe to call any number of times; only the
    /// first call touches the registry. Returns whether this call did it.
    ///
    /// The identity is removed only while this connection still owns it. If a
    /// newer connection has registered the same identity since, its entry is
    /// left in place rather than deleted by name.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;

        let conn_id = self.conn_id();
        match self.peer.take_identity() {
            Some(identity) => {
                let removed = self.router.registry().remove_owned(&identity, conn_id);
                sink_info!(
                    self.log,
                    "client disconnected: {} conn={}{} (now {} clients)",
                    identity,
                    conn_id,
                    if removed { "" } else { " (identity already taken over)" },
                    self.router.registry().len()
                );
            }
            None => {
                sink_info!(self.log, "unregistered connection {} closed", conn_id);
            }
        }
        true
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.close();
    }
}
