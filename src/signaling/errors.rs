use std::fmt;

use crate::signaling::types::ConnectionId;

/// Why a frame could not be queued for a connection.
///
/// Returned by [`PeerChannel::send_frame`](crate::signaling::channel::PeerChannel::send_frame);
/// the router only logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The connection's outbound queue is at capacity (peer not keeping up).
    Full { conn_id: ConnectionId },
    /// The receiving end is gone (connection thread exited).
    Closed { conn_id: ConnectionId },
}

impl ChannelError {
    pub fn conn_id(&self) -> ConnectionId {
        match *self {
            Self::Full { conn_id } | Self::Closed { conn_id } => conn_id,
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full { conn_id } => {
                write!(f, "outbound queue of connection {conn_id} is full")
            }
            Self::Closed { conn_id } => write!(f, "channel to connection {conn_id} is closed"),
        }
    }
}

impl std::error::Error for ChannelError {}
