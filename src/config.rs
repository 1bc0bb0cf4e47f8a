use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides, e.g. `RECALLBRICKS_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "RECALLBRICKS";

#[derive(Parser, Debug)]
#[command(author, version, about = "Local RecallBricks-compatible memory service", long_about = None)]
pub struct Cli {
    /// Config file path (YAML)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Require a bearer API key on every /api/v1 request
    #[arg(long, env = "AUTH_REQUIRED")]
    pub auth_required: Option<bool>,

    /// Accept this API key in addition to any configured keys
    #[arg(long, env = "RECALLBRICKS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,

    /// Emit logs as JSON lines
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub resilience: ResilienceConfig,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Largest accepted request body, in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            host: "127.0.0.1".to_string(),
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Reject requests without a bearer token.
    pub auth_required: bool,
    /// When non-empty, only these tokens are accepted.
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub timeout_disabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
    pub request_timeout_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            rate_limit_enabled: true,
            timeout_disabled: false,
            requests_per_second: 50,
            burst_size: 100,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub recency_half_life_hours: f64,
    /// Reputation of an agent with no contributions.
    pub initial_reputation: f64,
    /// Cached search rankings; 0 disables the cache.
    pub search_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recency_half_life_hours: 24.0,
            initial_reputation: 0.5,
            search_cache_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    /// Serve Prometheus metrics at `/metrics`.
    pub prometheus_enabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest to highest: defaults, YAML file, `RECALLBRICKS_*`
    /// environment, CLI flags (and their env fallbacks).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let defaults = AppConfig::default();
        let mut builder = Config::builder()
            .set_default("server.port", defaults.server.port)?
            .set_default("server.host", defaults.server.host)?
            .set_default(
                "server.body_limit_bytes",
                u64::try_from(defaults.server.body_limit_bytes).unwrap_or(u64::MAX),
            )?
            .set_default("security.auth_required", defaults.security.auth_required)?
            .set_default("security.api_keys", Vec::<String>::new())?
            .set_default(
                "resilience.rate_limit_enabled",
                defaults.resilience.rate_limit_enabled,
            )?
            .set_default("resilience.timeout_disabled", defaults.resilience.timeout_disabled)?
            .set_default(
                "resilience.requests_per_second",
                defaults.resilience.requests_per_second,
            )?
            .set_default("resilience.burst_size", defaults.resilience.burst_size)?
            .set_default(
                "resilience.request_timeout_secs",
                defaults.resilience.request_timeout_secs,
            )?
            .set_default(
                "engine.recency_half_life_hours",
                defaults.engine.recency_half_life_hours,
            )?
            .set_default("engine.initial_reputation", defaults.engine.initial_reputation)?
            .set_default(
                "engine.search_cache_capacity",
                u64::try_from(defaults.engine.search_cache_capacity).unwrap_or(u64::MAX),
            )?
            .set_default("telemetry.json_logs", defaults.telemetry.json_logs)?
            .set_default(
                "telemetry.prometheus_enabled",
                defaults.telemetry.prometheus_enabled,
            )?;

        // An explicit file must exist; ./config.yaml is picked up if present.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::new(path, FileFormat::Yaml).required(true)),
            None if Path::new("config.yaml").exists() => {
                builder.add_source(File::new("config.yaml", FileFormat::Yaml).required(false))
            }
            None => builder,
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("security.api_keys")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = &cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(auth) = cli.auth_required {
            builder = builder.set_override("security.auth_required", auth)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }
        if let Some(json) = cli.json_logs {
            builder = builder.set_override("telemetry.json_logs", json)?;
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        if let Some(key) = cli.api_key.filter(|k| !k.trim().is_empty()) {
            if !config.security.api_keys.contains(&key) {
                config.security.api_keys.push(key);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let fail = |msg: &str| Err(config::ConfigError::Message(msg.to_string()));
        if self.resilience.requests_per_second == 0 || self.resilience.burst_size == 0 {
            return fail("resilience.requests_per_second and burst_size must be positive");
        }
        if self.resilience.request_timeout_secs == 0 {
            return fail("resilience.request_timeout_secs must be positive");
        }
        let half_life = self.engine.recency_half_life_hours;
        if !(half_life.is_finite() && half_life > 0.0) {
            return fail("engine.recency_half_life_hours must be positive");
        }
        if !(0.0..=1.0).contains(&self.engine.initial_reputation) {
            return fail("engine.initial_reputation must be between 0 and 1");
        }
        if self.security.auth_required && self.security.api_keys.is_empty() {
            tracing::warn!(
                name: "config.auth_open",
                "auth_required is set without api_keys; any bearer token will be accepted"
            );
        }
        Ok(())
    }

    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "127.0.0.1:8787");
    }

    #[test]
    fn invalid_reputation_is_rejected() {
        let mut config = AppConfig::default();
        config.engine.initial_reputation = 1.5;
        assert!(config.validate().is_err());
    }
}
