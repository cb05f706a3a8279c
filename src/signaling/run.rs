use std::io;
use std::sync::Arc;

use crate::config::RelaySettings;
use crate::log::NoopLogSink;
use crate::log::log_sink::LogSink;
use crate::net_utils::{advertised_urls, discover_local_ipv4};
use crate::signaling::signaling_server::SignalingServer;
use crate::sink_info;

/// Run the relay described by `settings`, logging to `log_sink`. Blocks.
///
/// Prints the URLs clients can connect to, including the LAN address when the
/// listener is bound to all interfaces.
pub fn run_signaling_server_with_log(
    settings: &RelaySettings,
    log_sink: Arc<dyn LogSink>,
) -> io::Result<()> {
    let server = SignalingServer::from_settings(settings, log_sink.clone())?;

    let urls = advertised_urls(
        settings.ws_scheme(),
        server.local_addr(),
        discover_local_ipv4(),
    );
    for url in &urls {
        sink_info!(log_sink, "clients can connect to {}", url);
    }
    if settings.serve_test_page {
        let page_scheme = if server.is_tls() { "https" } else { "http" };
        if let Some(url) = urls.first() {
            sink_info!(
                log_sink,
                "connection test page: {}",
                url.replacen(settings.ws_scheme(), page_scheme, 1)
            );
        }
    }

    server.run()
}

/// Convenience: run the relay with a `NoopLogSink` (no logging).
pub fn run_signaling_server(settings: &RelaySettings) -> io::Result<()> {
    run_signaling_server_with_log(settings, Arc::new(NoopLogSink))
}
