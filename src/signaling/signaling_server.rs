use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use rustls::{ServerConfig, ServerConnection, StreamOwned};

use crate::config::RelaySettings;
use crate::log::log_sink::LogSink;
use crate::signaling::registry::Registry;
use crate::signaling::router::Router;
use crate::signaling::transport::serve_connection;
use crate::signaling::types::ConnectionId;
use crate::tls_utils::build_relay_server_config;
use crate::{sink_debug, sink_info, sink_warn};

/// Top-level runtime object for the relay.
///
/// This owns:
/// - the bound listener
/// - the logging sink
/// - the shared router (and through it the registry)
/// - optional TLS configuration
///
/// and spawns one thread per accepted connection.
pub struct SignalingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    log: Arc<dyn LogSink>,
    router: Arc<Router>,
    tls: Option<Arc<ServerConfig>>,
    serve_test_page: bool,
}

impl SignalingServer {
    /// Binds a plain (`ws://`) listener with the test page enabled.
    pub fn bind<A: ToSocketAddrs>(addr: A, log: Arc<dyn LogSink>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let router = Arc::new(Router::with_log(Arc::new(Registry::new()), log.clone()));
        Ok(Self {
            listener,
            local_addr,
            log,
            router,
            tls: None,
            serve_test_page: true,
        })
    }

    /// Binds according to `settings`, loading TLS material when enabled.
    pub fn from_settings(settings: &RelaySettings, log: Arc<dyn LogSink>) -> io::Result<Self> {
        let tls = match settings.tls {
            Some(ref paths) => Some(build_relay_server_config(paths)?),
            None => None,
        };
        let mut server = Self::bind(settings.bind_addr.as_str(), log)?;
        server.tls = tls;
        server.serve_test_page = settings.serve_test_page;
        Ok(server)
    }

    pub fn with_tls(mut self, config: Arc<ServerConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    pub fn with_test_page(mut self, enabled: bool) -> Self {
        self.serve_test_page = enabled;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Shared registry; lets an embedder (or a test) observe registrations.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(self.router.registry())
    }

    /// Blocking accept loop. Only returns if the listener itself fails.
    pub fn run(self) -> io::Result<()> {
        let Self {
            listener,
            local_addr,
            log,
            router,
            tls,
            serve_test_page,
        } = self;

        sink_info!(
            log,
            "signaling relay listening on {} ({})",
            local_addr,
            if tls.is_some() { "wss" } else { "ws" }
        );

        let mut next_conn_id: ConnectionId = 1;

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(
                        log,
                        "incoming TCP accept failed: {:?} (continuing to accept)",
                        e
                    );
                    continue;
                }
            };

            let conn_id = next_conn_id;
            next_conn_id += 1;

            match stream.peer_addr() {
                Ok(peer) => sink_info!(log, "accepted {} as conn {}", peer, conn_id),
                Err(_) => sink_info!(log, "accepted conn {}", conn_id),
            }
            socket_option_applied(&log, conn_id, "TCP_NODELAY", stream.set_nodelay(true));

            let spawned = thread::Builder::new()
                .name(format!("relay-conn-{conn_id}"))
                .spawn({
                    let router = Arc::clone(&router);
                    let log = Arc::clone(&log);
                    let tls = tls.clone();
                    move || handle_stream(stream, conn_id, tls, router, serve_test_page, log)
                });

            if let Err(e) = spawned {
                sink_warn!(
                    log,
                    "failed to spawn thread for conn {}: {:?}",
                    conn_id,
                    e
                );
            }
        }

        Ok(())
    }
}

fn handle_stream(
    stream: TcpStream,
    conn_id: ConnectionId,
    tls: Option<Arc<ServerConfig>>,
    router: Arc<Router>,
    serve_test_page: bool,
    log: Arc<dyn LogSink>,
) {
    match tls {
        None => serve_connection(stream, conn_id, router, serve_test_page, log),
        Some(config) => match ServerConnection::new(config) {
            Ok(conn) => serve_connection(
                StreamOwned::new(conn, stream),
                conn_id,
                router,
                serve_test_page,
                log,
            ),
            Err(e) => sink_warn!(log, "conn {}: TLS session setup failed: {}", conn_id, e),
        },
    }
}

/// Logs a failed per-connection socket option. The connection is served
/// either way; returns whether the option took effect.
fn socket_option_applied(
    log: &Arc<dyn LogSink>,
    conn_id: ConnectionId,
    option: &str,
    result: io::Result<()>,
) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            sink_debug!(log, "conn {}: cannot set {}: {}", conn_id, option, e);
            false
        }
    }
}
