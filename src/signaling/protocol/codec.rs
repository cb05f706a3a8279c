use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{InboundMsg, OutboundMsg, ProtoError, REGISTER_TYPE};

/// Every field the relay looks at. Anything else in the object is ignored.
///
/// `type`, `id` and `role` only matter for a registration, so they are kept
/// untyped here and checked on that path alone.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    msg_type: Option<Value>,
    id: Option<Value>,
    role: Option<Value>,
    target: Option<String>,
    broadcast: Option<String>,
    #[serde(default, deserialize_with = "present")]
    kind: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    payload: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it is forwarded as-is.
fn present<'de, D>(d: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(d).map(Some)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

fn non_empty_str(v: Option<Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Parses and classifies one text frame.
///
/// Returns `Ok(None)` for a well-formed object that is neither a registration
/// nor addressed to anyone; the router treats that as a no-op.
///
/// # Errors
/// [`ProtoError`] when the frame is not a JSON object, a known field has the
/// wrong type, or a registration lacks a string `id` or `role`.
pub fn decode_inbound(text: &str) -> Result<Option<InboundMsg>, ProtoError> {
    let raw: RawFrame = serde_json::from_str(text)?;

    if raw.msg_type.as_ref().and_then(Value::as_str) == Some(REGISTER_TYPE) {
        let identity =
            non_empty_str(raw.id).ok_or(ProtoError::InvalidFormat("register without id"))?;
        let role =
            non_empty_str(raw.role).ok_or(ProtoError::InvalidFormat("register without role"))?;
        return Ok(Some(InboundMsg::Register { identity, role }));
    }

    // `target` wins over `broadcast` when both are present.
    if let Some(target) = non_empty(raw.target) {
        return Ok(Some(InboundMsg::Directed {
            target,
            kind: raw.kind,
            payload: raw.payload,
        }));
    }

    if let Some(role) = non_empty(raw.broadcast) {
        return Ok(Some(InboundMsg::Broadcast {
            role,
            kind: raw.kind,
            payload: raw.payload,
        }));
    }

    Ok(None)
}

/// Same as [`decode_inbound`] for a binary frame carrying UTF-8 JSON.
///
/// # Errors
/// [`ProtoError::InvalidUtf8`] if the bytes are not text, otherwise as
/// [`decode_inbound`].
pub fn decode_inbound_bytes(bytes: &[u8]) -> Result<Option<InboundMsg>, ProtoError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)?;
    decode_inbound(text)
}

/// # Errors
/// [`ProtoError::Encode`] if serialization fails.
pub fn encode_outbound(msg: &OutboundMsg) -> Result<String, ProtoError> {
    serde_json::to_string(msg).map_err(ProtoError::Encode)
}
