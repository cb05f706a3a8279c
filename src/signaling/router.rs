use std::sync::Arc;

use serde_json::Value;

use crate::log::{NoopLogSink, log_sink::LogSink};
use crate::signaling::protocol::{InboundMsg, OutboundMsg, encode_outbound};
use crate::signaling::registry::{ConnectionEntry, Registry};
use crate::signaling::session::PeerState;
use crate::signaling::types::{ConnectionId, Identity};
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

/// What dispatching one inbound message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The sender is now registered under `identity`.
    /// `replaced` is the connection that held the identity before, if any.
    Registered {
        identity: Identity,
        replaced: Option<ConnectionId>,
    },
    /// A frame was handed to `attempted` channels, `delivered` of which accepted it.
    Forwarded { attempted: usize, delivered: usize },
    /// Directed message to an identity nobody holds.
    TargetNotFound,
    /// The outbound frame could not be built; nothing was sent.
    Dropped,
}

/// Decides where each inbound message goes and pushes it there.
///
/// Delivery is fire-and-forget: failures are logged, never reported back to
/// the sender, and one broken recipient never affects the others.
pub struct Router {
    registry: Arc<Registry>,
    log: Arc<dyn LogSink>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_log(registry, Arc::new(NoopLogSink))
    }

    pub fn with_log(registry: Arc<Registry>, log: Arc<dyn LogSink>) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Main entrypoint: route one message from `peer`.
    pub fn dispatch(&self, peer: &mut PeerState, msg: InboundMsg) -> RouteOutcome {
        sink_debug!(
            self.log,
            "conn {} ({:?}) -> {}",
            peer.conn_id(),
            peer.identity(),
            msg.name()
        );

        match msg {
            InboundMsg::Register { identity, role } => self.handle_register(peer, identity, role),
            InboundMsg::Directed {
                target,
                kind,
                payload,
            } => self.forward_directed(peer, &target, kind, payload),
            InboundMsg::Broadcast {
                role,
                kind,
                payload,
            } => self.forward_broadcast(peer, &role, kind, payload),
        }
    }

    fn handle_register(&self, peer: &mut PeerState, identity: Identity, role: String) -> RouteOutcome {
        let conn_id = peer.conn_id();

        // Re-registering under a new name must not leave the old name behind.
        if let Some(previous) = peer.identity() {
            if previous != identity && self.registry.remove_owned(previous, conn_id) {
                sink_info!(
                    self.log,
                    "conn {} re-registered: dropped identity {}",
                    conn_id,
                    previous
                );
            }
        }

        let replaced = self
            .registry
            .register(identity.clone(), role.clone(), peer.channel().clone())
            .filter(|&old| old != conn_id);
        peer.set_identity(identity.clone());

        if let Some(old) = replaced {
            sink_info!(
                self.log,
                "identity {} taken over by conn {} (was conn {})",
                identity,
                conn_id,
                old
            );
        }
        sink_info!(
            self.log,
            "client registered: {} role={} conn={} (now {} clients)",
            identity,
            role,
            conn_id,
            self.registry.len()
        );

        RouteOutcome::Registered { identity, replaced }
    }

    fn forward_directed(
        &self,
        peer: &PeerState,
        target: &str,
        kind: Option<Value>,
        payload: Option<Value>,
    ) -> RouteOutcome {
        let Some(entry) = self.registry.lookup_by_identity(target) else {
            sink_warn!(
                self.log,
                "target {} not found (from {:?}); message dropped",
                target,
                peer.identity()
            );
            return RouteOutcome::TargetNotFound;
        };

        let Some(frame) = self.build_frame(peer, kind, payload) else {
            return RouteOutcome::Dropped;
        };

        sink_debug!(
            self.log,
            "forward {:?} -> {} (conn {})",
            peer.identity(),
            target,
            entry.conn_id()
        );
        let delivered = usize::from(self.deliver(&entry, frame));
        RouteOutcome::Forwarded {
            attempted: 1,
            delivered,
        }
    }

    fn forward_broadcast(
        &self,
        peer: &PeerState,
        role: &str,
        kind: Option<Value>,
        payload: Option<Value>,
    ) -> RouteOutcome {
        let recipients = self.registry.lookup_by_role(role, peer.identity());

        let Some(frame) = self.build_frame(peer, kind, payload) else {
            return RouteOutcome::Dropped;
        };

        sink_debug!(
            self.log,
            "broadcast {:?} -> role {} ({} recipients)",
            peer.identity(),
            role,
            recipients.len()
        );

        let delivered = recipients
            .iter()
            .filter(|entry| self.deliver(entry, frame.clone()))
            .count();

        RouteOutcome::Forwarded {
            attempted: recipients.len(),
            delivered,
        }
    }

    fn build_frame(
        &self,
        peer: &PeerState,
        kind: Option<Value>,
        payload: Option<Value>,
    ) -> Option<String> {
        let out = OutboundMsg {
            from: peer.identity().map(str::to_owned),
            payload,
            kind,
        };
        match encode_outbound(&out) {
            Ok(frame) => Some(frame),
            Err(e) => {
                sink_warn!(self.log, "conn {}: {}", peer.conn_id(), e);
                None
            }
        }
    }

    /// Pushes one frame to one recipient; a failure only concerns that recipient.
    fn deliver(&self, entry: &ConnectionEntry, frame: String) -> bool {
        sink_trace!(self.log, "send to {}: {}", entry.identity, frame);
        match entry.channel.send_frame(frame) {
            Ok(()) => true,
            Err(e) => {
                sink_warn!(self.log, "send to {} failed: {}", entry.identity, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::{MemoryLogSink, log_level::LogLevel};
    use crate::signaling::channel::{OUTBOUND_QUEUE_CAP, PeerChannel};
    use serde_json::json;
    use std::sync::mpsc::Receiver;

    struct Peer {
        state: PeerState,
        rx: Receiver<String>,
    }

    impl Peer {
        fn new(conn_id: ConnectionId) -> Self {
            let (channel, rx) = PeerChannel::bounded(conn_id, OUTBOUND_QUEUE_CAP);
            Self {
                state: PeerState::new(channel),
                rx,
            }
        }

        fn received(&self) -> Vec<Value> {
            self.rx
                .try_iter()
                .map(|f| serde_json::from_str(&f).unwrap())
                .collect()
        }
    }

    fn router() -> (Router, Arc<MemoryLogSink>) {
        let log = Arc::new(MemoryLogSink::new());
        (Router::with_log(Arc::new(Registry::new()), log.clone()), log)
    }

    fn register(router: &Router, peer: &mut Peer, id: &str, role: &str) {
        let out = router.dispatch(
            &mut peer.state,
            InboundMsg::Register {
                identity: id.into(),
                role: role.into(),
            },
        );
        assert!(matches!(out, RouteOutcome::Registered { .. }), "got {out:?}");
    }

    fn directed(target: &str, kind: &str, payload: Value) -> InboundMsg {
        InboundMsg::Directed {
            target: target.into(),
            kind: Some(json!(kind)),
            payload: Some(payload),
        }
    }

    fn broadcast(role: &str, kind: &str, payload: Value) -> InboundMsg {
        InboundMsg::Broadcast {
            role: role.into(),
            kind: Some(json!(kind)),
            payload: Some(payload),
        }
    }

    #[test]
    fn register_records_identity_and_sends_nothing() {
        let (router, _) = router();
        let mut a = Peer::new(1);

        register(&router, &mut a, "a", "x");

        assert_eq!(a.state.identity(), Some("a"));
        assert_eq!(router.registry().lookup_by_identity("a").unwrap().role, "x");
        assert!(a.received().is_empty());
    }

    #[test]
    fn directed_message_reaches_only_the_target() {
        let (router, _) = router();
        let mut a = Peer::new(1);
        let mut b = Peer::new(2);
        register(&router, &mut a, "a", "x");
        register(&router, &mut b, "b", "y");

        let payload = json!({"sdp": "v=0"});
        let out = router.dispatch(&mut a.state, directed("b", "offer", payload.clone()));

        assert_eq!(
            out,
            RouteOutcome::Forwarded {
                attempted: 1,
                delivered: 1
            }
        );
        assert_eq!(
            b.received(),
            vec![json!({"from": "a", "kind": "offer", "payload": payload})]
        );
        assert!(a.received().is_empty());
    }

    #[test]
    fn directed_to_unknown_target_is_logged_and_dropped() {
        let (router, log) = router();
        let mut a = Peer::new(1);
        let mut b = Peer::new(2);
        register(&router, &mut a, "a", "x");
        register(&router, &mut b, "b", "y");

        let out = router.dispatch(&mut a.state, directed("ghost", "offer", json!("P")));

        assert_eq!(out, RouteOutcome::TargetNotFound);
        assert!(a.received().is_empty());
        assert!(b.received().is_empty());
        assert!(log.contains(LogLevel::Warn, "target ghost not found"));
    }

    #[test]
    fn broadcast_reaches_every_other_member_of_the_role() {
        let (router, _) = router();
        let mut a = Peer::new(1);
        let mut b = Peer::new(2);
        let mut c = Peer::new(3);
        let mut d = Peer::new(4);
        register(&router, &mut a, "a", "broadcaster");
        register(&router, &mut b, "b", "viewer");
        register(&router, &mut c, "c", "viewer");
        register(&router, &mut d, "d", "broadcaster");

        let out = router.dispatch(&mut a.state, broadcast("viewer", "ice", json!("P")));

        assert_eq!(
            out,
            RouteOutcome::Forwarded {
                attempted: 2,
                delivered: 2
            }
        );
        let expected = vec![json!({"from": "a", "kind": "ice", "payload": "P"})];
        assert_eq!(b.received(), expected);
        assert_eq!(c.received(), expected);
        assert!(a.received().is_empty());
        assert!(d.received().is_empty());
    }

    #[test]
    fn broadcaster_never_receives_its_own_broadcast() {
        let (router, _) = router();
        let mut a = Peer::new(1);
        let mut b = Peer::new(2);
        register(&router, &mut a, "a", "viewer");
        register(&router, &mut b, "b", "viewer");

        router.dispatch(&mut a.state, broadcast("viewer", "ice", json!(1)));

        assert!(a.received().is_empty());
        assert_eq!(b.received().len(), 1);
    }

    #[test]
    fn broken_recipient_does_not_stop_the_fan_out() {
        let (router, log) = router();
        let mut a = Peer::new(1);
        let mut b = Peer::new(2);
        let mut c = Peer::new(3);
        let mut d = Peer::new(4);
        register(&router, &mut a, "a", "broadcaster");
        register(&router, &mut b, "b", "viewer");
        register(&router, &mut c, "c", "viewer");
        register(&router, &mut d, "d", "viewer");

        // c's connection thread is gone but its entry is still registered.
        let Peer { rx: c_rx, .. } = c;
        drop(c_rx);

        let out = router.dispatch(&mut a.state, broadcast("viewer", "ice", json!("P")));

        assert_eq!(
            out,
            RouteOutcome::Forwarded {
                attempted: 3,
                delivered: 2
            }
        );
        assert_eq!(b.received().len(), 1);
        assert_eq!(d.received().len(), 1);
        assert!(log.contains(LogLevel::Warn, "send to c failed"));
    }

    #[test]
    fn stalled_recipient_is_capped_and_others_keep_receiving() {
        let (router, log) = router();
        let mut a = Peer::new(1);
        let mut slow = Peer::new(2);
        let mut fast = Peer::new(3);
        register(&router, &mut a, "a", "broadcaster");
        register(&router, &mut slow, "slow", "viewer");
        register(&router, &mut fast, "fast", "viewer");

        // `slow` never drains its queue.
        for _ in 0..OUTBOUND_QUEUE_CAP {
            router.dispatch(&mut a.state, broadcast("viewer", "ice", json!("P")));
            assert_eq!(fast.received().len(), 1);
        }

        let payload = json!("x".repeat(1024));
        for _ in 0..1_000 {
            let out = router.dispatch(&mut a.state, broadcast("viewer", "ice", payload.clone()));
            assert_eq!(
                out,
                RouteOutcome::Forwarded {
                    attempted: 2,
                    delivered: 1
                }
            );
            assert_eq!(fast.received().len(), 1);
        }

        let out = router.dispatch(&mut a.state, directed("slow", "offer", payload));
        assert_eq!(
            out,
            RouteOutcome::Forwarded {
                attempted: 1,
                delivered: 0
            }
        );
        assert_eq!(slow.rx.try_iter().count(), OUTBOUND_QUEUE_CAP);
        assert!(log.contains(LogLevel::Warn, "outbound queue of connection 2 is full"));
    }

    #[test]
    fn re_register_with_new_role_replaces_old_role() {
        let (router, _) = router();
        let mut a = Peer::new(1);
        let mut s = Peer::new(2);
        register(&router, &mut a, "a", "viewer");
        register(&router, &mut s, "s", "broadcaster");

        register(&router, &mut a, "a", "listener");

        router.dispatch(&mut s.state, broadcast("viewer", "ice", json!(1)));
        assert!(a.received().is_empty());

        router.dispatch(&mut s.state, broadcast("listener", "ice", json!(2)));
        assert_eq!(a.received(), vec![json!({"from": "s", "kind": "ice", "payload": 2})]);
    }

    #[test]
    fn re_register_under_new_identity_drops_the_old_one() {
        let (router, _) = router();
        let mut a = Peer::new(1);
        register(&router, &mut a, "a", "viewer");
        register(&router, &mut a, "a2", "viewer");

        assert!(router.registry().lookup_by_identity("a").is_none());
        assert_eq!(router.registry().identities(), vec!["a2"]);
    }

    #[test]
    fn duplicate_identity_last_writer_wins() {
        let (router, log) = router();
        let mut first = Peer::new(1);
        let mut second = Peer::new(2);
        let mut sender = Peer::new(3);
        register(&router, &mut first, "dup", "viewer");

        let out = router.dispatch(
            &mut second.state,
            InboundMsg::Register {
                identity: "dup".into(),
                role: "viewer".into(),
            },
        );
        assert_eq!(
            out,
            RouteOutcome::Registered {
                identity: "dup".into(),
                replaced: Some(1)
            }
        );
        assert!(log.contains(LogLevel::Info, "taken over by conn 2"));

        register(&router, &mut sender, "s", "x");
        router.dispatch(&mut sender.state, directed("dup", "offer", json!(0)));

        assert!(first.received().is_empty());
        assert_eq!(second.received().len(), 1);
    }

    #[test]
    fn unregistered_sender_forwards_with_null_from() {
        let (router, _) = router();
        let mut anon = Peer::new(1);
        let mut b = Peer::new(2);
        register(&router, &mut b, "b", "viewer");

        router.dispatch(&mut anon.state, directed("b", "offer", json!("P")));
        router.dispatch(&mut anon.state, broadcast("viewer", "ice", json!("Q")));

        assert_eq!(
            b.received(),
            vec![
                json!({"from": null, "kind": "offer", "payload": "P"}),
                json!({"from": null, "kind": "ice", "payload": "Q"}),
            ]
        );
    }

    #[test]
    fn missing_kind_and_payload_are_omitted_not_invented() {
        let (router, _) = router();
        let mut a = Peer::new(1);
        let mut b = Peer::new(2);
        register(&router, &mut a, "a", "x");
        register(&router, &mut b, "b", "y");

        router.dispatch(
            &mut a.state,
            InboundMsg::Directed {
                target: "b".into(),
                kind: None,
                payload: None,
            },
        );

        assert_eq!(b.received(), vec![json!({"from": "a"})]);
    }
}
