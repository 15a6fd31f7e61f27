//! Mine App backend.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ net::listener ──▶ tower layers ──▶ pipeline ──────────▶ router
//!                                (request id,     body parser           /
//!                                 trace,          cors                  /health
//!                                 catch panic)    security headers      /api/joke ──▶ upstream
//!                                                 rate limit
//!                                                     │                    │
//!   Client ◀──────────────────── response ◀───────────┴─── http::error ◀───┘
//! ```
//!
//! # Startup
//! 1. Load `.env`, then config (`MINE_CONFIG` file, `HOST`/`PORT` overrides)
//! 2. Initialize logging
//! 3. Enforce the runtime version lock (exit 1 on mismatch)
//! 4. Bind the listener and serve until SIGINT/SIGTERM

use std::sync::Arc;

use mine_backend::config;
use mine_backend::http::HttpServer;
use mine_backend::lifecycle::{self, signals, Shutdown};
use mine_backend::net;
use mine_backend::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lifecycle::process_started_at();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {e}");
        }
    }

    let config = config::load_from_env()?;
    logging::init(&config.observability);

    lifecycle::enforce_version_lock(&config.runtime.required_version);

    tracing::info!(
        version = lifecycle::RUNTIME_VERSION,
        port = config.listener.port,
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = net::bind(&config.listener).await?;

    let shutdown = Arc::new(Shutdown::new());
    let shutdown_rx = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    let server = HttpServer::new(config);
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
