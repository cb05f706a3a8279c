/// Transport-assigned identifier for one accepted connection.
///
/// Distinct from the client-chosen [`Identity`]: two connections may claim the
/// same identity, but never share a `ConnectionId`.
pub type ConnectionId = u64;

/// Client-supplied name a connection registers under. Opaque to the relay.
pub type Identity = String;

/// Client-supplied category used only for broadcast matching.
pub type Role = String;
