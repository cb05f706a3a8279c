use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signaling::types::{Identity, Role};

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMsg {
    /// `{"type":"register","id":..,"role":..}`
    Register { identity: Identity, role: Role },
    /// `{"target":..,"kind":..,"payload":..}`
    Directed {
        target: Identity,
        kind: Option<Value>,
        payload: Option<Value>,
    },
    /// `{"broadcast":..,"kind":..,"payload":..}`
    Broadcast {
        role: Role,
        kind: Option<Value>,
        payload: Option<Value>,
    },
}

impl InboundMsg {
    /// Short variant name for logging. Never includes the payload.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Directed { .. } => "directed",
            Self::Broadcast { .. } => "broadcast",
        }
    }
}

/// Frame the relay forwards: `{"from":..,"payload":..,"kind":..}`.
///
/// `from` is `null` when the sender never registered. `kind` and `payload`
/// are copied verbatim and omitted when the inbound frame had none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMsg {
    pub from: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
}
