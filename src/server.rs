use axum::{
    Router,
    extract::{DefaultBodyLimit, MatchedPath, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::api;
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::error::ApiError;
use crate::persistence::{PersistenceLayer, providers::InMemoryProvider};
use crate::security::auth::auth_middleware;
use crate::security::rate_limit::{AppRateLimiter, rate_limit_middleware};
use crate::telemetry;

/// Build shared state backed by a fresh in-memory store.
pub fn build_state(config: Arc<AppConfig>) -> AppState {
    let persistence: Arc<dyn PersistenceLayer> = Arc::new(InMemoryProvider::new());
    let engine = Arc::new(Engine::new(persistence, &config.engine));

    let rate_limiter = Arc::new(AppRateLimiter::new(
        config.resilience.requests_per_second,
        config.resilience.burst_size,
    ));

    let metrics = if config.telemetry.prometheus_enabled {
        match telemetry::install_prometheus() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(name: "metrics.install_failed", error = %e, "Prometheus exporter unavailable");
                None
            }
        }
    } else {
        None
    };

    AppState {
        engine,
        config,
        rate_limiter,
        metrics,
    }
}

/// Assemble the full router: authenticated `/api/v1`, open `/health` and
/// `/metrics`, and the shared middleware stack.
pub fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // Layers run bottom-up on the way in: auth sees the request before the limiter.
    let api = api::router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Effectively no timeout when disabled, which keeps the layer types identical.
    let timeout_duration = if config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(config.resilience.request_timeout_secs)
    };

    Router::new()
        .route("/health", get(api::health::health))
        .route("/metrics", get(api::health::prometheus_metrics))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => ApiError::Timeout.into_response(),
                }
            },
        ))
        .layer(axum::middleware::from_fn(track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .with_state(state)
}

async fn track_http_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let method = req.method().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "recallbricks_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(
        "recallbricks_http_request_duration_seconds",
        "method" => method,
        "path" => path,
    )
    .record(started.elapsed().as_secs_f64());
    response
}

/// Start the server and serve until the process is stopped.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    let app = build_app(build_state(Arc::clone(&config)));

    info!(
        name: "server.started",
        address = %addr,
        auth_required = config.security.auth_required,
        rate_limit = config.resilience.rate_limit_enabled,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

/// Bind (port 0 picks a free port) and serve in the background.
pub async fn spawn(config: Arc<AppConfig>) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    let addr = listener.local_addr()?;
    let app = build_app(build_state(config));

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(name: "server.failed", error = %e, "Embedded server stopped");
        }
    });
    info!(name: "server.spawned", address = %addr, "Embedded server started");
    Ok((addr, handle))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(name: "server.signal_failed", error = %e, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
