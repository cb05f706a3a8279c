pub mod channel;
pub mod errors;
pub mod http;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod run;
pub mod session;
pub mod signaling_server;
pub mod transport;
pub mod types;

pub use channel::PeerChannel;
pub use registry::{ConnectionEntry, Registry};
pub use router::{RouteOutcome, Router};
pub use session::{ConnectionSession, PeerState};
pub use signaling_server::SignalingServer;
