//! Local RecallBricks-compatible server.
//!
//! Serves the `/api/v1` memory contract from process memory on
//! `http://localhost:8787` by default.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_async)]

use std::sync::Arc;

use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::info;

use recallbricks_local::{config::AppConfig, server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init(&config.telemetry);

    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        api_keys = config.security.api_keys.len(),
        prometheus = config.telemetry.prometheus_enabled,
        "Configuration loaded"
    );

    if let Err(e) = server::start_server(Arc::new(config)).await {
        tracing::error!(name: "server.error", error = ?e, "Server exited with error");
        std::process::exit(1);
    }
}
