//! Local RecallBricks-compatible memory service.
//!
//! An in-memory implementation of the RecallBricks HTTP contract: memory
//! CRUD, weighted search, predictive recall with feedback, and multi-agent
//! reputation and synthesis. It backs local development, offline demos and
//! contract tests for the `recallbricks` SDK.
//!
//! Scoring, prediction and reputation here are simple documented heuristics
//! (lexical overlap, exponential recency decay, Bayesian-smoothed averages).
//!
//! # Modules
//!
//! - [`domain`]: wire and storage types
//! - [`engine`]: memory store, search, metacognition and collaboration services
//! - [`persistence`]: storage trait and the in-memory provider
//! - [`api`]: axum handlers under `/api/v1`
//! - [`server`]: router assembly and startup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod security;
pub mod server;
pub mod telemetry;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::security::rate_limit::AppRateLimiter;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Memory, search, metacognition and collaboration services.
    pub engine: Arc<Engine>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Per-key rate limiter
    pub rate_limiter: Arc<AppRateLimiter>,
    /// Present when the Prometheus exporter is enabled.
    pub metrics: Option<PrometheusHandle>,
}
