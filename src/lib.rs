//! rustyrelay is a signaling relay for peer-to-peer real-time connections.
//!
//! Clients connect over WebSocket, register under an identity and a role, and
//! then exchange negotiation messages (session descriptions, candidates) that
//! the relay forwards without looking inside:
//! - to one peer, by identity (`{"target": ...}`)
//! - to every other peer holding a role (`{"broadcast": ...}`)
//!
//! The binary `signaling_server` runs the relay.

/// Configuration file loading and the typed relay settings.
pub mod config;
/// Logging utilities: sinks, the file logger and the `sink_*!` macros.
pub mod log;
/// LAN address discovery for advertising connect URLs.
pub mod net_utils;
/// Registry, router, connection lifecycle and the WebSocket transport.
pub mod signaling;
/// TLS certificate/key loading for `wss://`.
pub mod tls_utils;
