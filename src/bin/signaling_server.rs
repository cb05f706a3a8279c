use std::path::Path;
use std::sync::Arc;
use std::{env, process};

use rustyrelay::config::{Config, RelaySettings};
use rustyrelay::log::log_sink::LogSink;
use rustyrelay::log::logger::Logger;
use rustyrelay::signaling::run::run_signaling_server_with_log;

const CONFIG_ENV: &str = "RUSTYRELAY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "relay.conf";

fn main() -> std::io::Result<()> {
    // --- Load config -------------------------------------------------------
    //
    // $RUSTYRELAY_CONFIG, else ./relay.conf if present, else built-in defaults.
    let config = match env::var(CONFIG_ENV) {
        Ok(path) => Config::load(&path).unwrap_or_else(|e| {
            eprintln!("[signaling_server] {e}");
            process::exit(1);
        }),
        Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Config::load(DEFAULT_CONFIG_FILE).unwrap_or_else(|e| {
                eprintln!("[signaling_server] {e}");
                process::exit(1);
            })
        }
        Err(_) => Config::empty(),
    };
    let mut settings = RelaySettings::from_config(&config);

    // --- Parse CLI args ----------------------------------------------------
    //
    // Supported:
    //   cargo run --bin signaling_server
    //      -> binds to [Signaling] bind_addr (default 0.0.0.0:3000)
    //
    //   cargo run --bin signaling_server -- 0.0.0.0:6000
    //      -> binds to 0.0.0.0:6000
    //
    //   cargo run --bin signaling_server -- 127.0.0.1 7000
    //      -> binds to 127.0.0.1:7000
    let args: Vec<String> = env::args().collect();

    match args.len() {
        1 => {}
        2 => settings.bind_addr = args[1].clone(),
        3 => settings.bind_addr = format!("{}:{}", args[1], args[2]),
        _ => {
            eprintln!("Usage:");
            eprintln!("  {}                # listen on the configured address", args[0]);
            eprintln!("  {} [ADDR]         # e.g. 0.0.0.0:6000", args[0]);
            eprintln!("  {} [IP] [PORT]    # e.g. 127.0.0.1 6000", args[0]);
            eprintln!();
            eprintln!("Config file: ${CONFIG_ENV} or ./{DEFAULT_CONFIG_FILE}");
            process::exit(1);
        }
    }

    // --- Start process logger ----------------------------------------------
    let logger = Logger::start_server(1024, &settings.logging);
    let log_sink: Arc<dyn LogSink> = Arc::new(logger.handle());

    eprintln!(
        "[signaling_server] starting on {} (log file {})",
        settings.bind_addr,
        logger.file_path().display()
    );

    // --- Run relay (blocks) ------------------------------------------------
    run_signaling_server_with_log(&settings, log_sink)
}
