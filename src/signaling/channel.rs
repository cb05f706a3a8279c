use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::signaling::errors::ChannelError;
use crate::signaling::types::ConnectionId;

/// Frames a connection may have waiting for its socket before further
/// sends to it are refused.
pub const OUTBOUND_QUEUE_CAP: usize = 256;

/// Handle for pushing serialized frames to one connection.
///
/// The connection thread owns the matching `Receiver` and writes whatever
/// arrives to its socket. Sending never blocks: it fails when the queue is
/// full or once that thread has exited, which is how closure is detected.
#[derive(Debug, Clone)]
pub struct PeerChannel {
    conn_id: ConnectionId,
    tx: SyncSender<String>,
}

impl PeerChannel {
    pub fn new(conn_id: ConnectionId, tx: SyncSender<String>) -> Self {
        Self { conn_id, tx }
    }

    /// A channel with a queue of `cap` frames, plus the receiving end.
    pub fn bounded(conn_id: ConnectionId, cap: usize) -> (Self, Receiver<String>) {
        let (tx, rx) = mpsc::sync_channel(cap.max(1));
        (Self::new(conn_id, tx), rx)
    }

    /// Connection this channel writes to.
    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    pub fn send_frame(&self, frame: String) -> Result<(), ChannelError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::Full {
                conn_id: self.conn_id,
            },
            TrySendError::Disconnected(_) => ChannelError::Closed {
                conn_id: self.conn_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn frames_arrive_in_order() {
        let (ch, rx) = PeerChannel::bounded(7, OUTBOUND_QUEUE_CAP);

        ch.send_frame("one".into()).unwrap();
        ch.send_frame("two".into()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
        assert_eq!(ch.conn_id(), 7);
    }

    #[test]
    fn send_after_receiver_dropped_reports_closed() {
        let (ch, rx) = PeerChannel::bounded(3, OUTBOUND_QUEUE_CAP);
        drop(rx);

        assert_eq!(
            ch.send_frame("late".into()),
            Err(ChannelError::Closed { conn_id: 3 })
        );
    }

    #[test]
    fn undrained_queue_refuses_frames_past_capacity() {
        let (ch, rx) = PeerChannel::bounded(5, 4);

        for i in 0..4 {
            ch.send_frame(format!("f{i}")).unwrap();
        }
        for _ in 0..1_000 {
            assert_eq!(
                ch.send_frame("x".repeat(1024)),
                Err(ChannelError::Full { conn_id: 5 })
            );
        }
        assert_eq!(rx.try_iter().count(), 4);

        // Once drained, the connection accepts frames again.
        ch.send_frame("again".into()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "again");
    }
}
