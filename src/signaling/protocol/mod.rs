//! JSON wire format of the relay.
//!
//! Inbound frames are classified into [`InboundMsg`]; forwarded frames are
//! built as [`OutboundMsg`]. `kind` and `payload` are carried as opaque JSON.

pub mod codec;
pub mod errors;
pub mod msg;

pub use codec::{decode_inbound, encode_outbound};
pub use errors::ProtoError;
pub use msg::{InboundMsg, OutboundMsg};

/// Value of `type` that marks a registration frame.
pub const REGISTER_TYPE: &str = "register";
