//! Embeddable local server.
//!
//! Runs `recallbricks-local` inside the calling process on its own port, so
//! tests and offline demos can use the real HTTP client without a separate
//! server. Enable with `features = ["embedded"]`.

use recallbricks_local::{config::AppConfig, server};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// A running in-process server. The server stops when this is dropped.
///
/// # Example
///
/// ```rust,ignore
/// use recallbricks::Runtime;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runtime = Runtime::builder()
///         .config_path("config.yaml")
///         .api_key("rb_local")
///         .start()
///         .await?;
///
///     println!("Serving at {}", runtime.base_url());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Runtime {
    config: Arc<AppConfig>,
    addr: SocketAddr,
    api_key: Option<String>,
    handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Get a reference to the server configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://host:port` of the running server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A client pointed at this server, using the configured API key.
    #[cfg(feature = "http-client")]
    pub fn client(&self) -> Result<crate::Client> {
        let key = self.api_key.clone().unwrap_or_else(|| "rb_local".to_string());
        crate::Client::new(key)?.with_base_url(self.base_url())
    }

    /// Stop the server.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Builder for creating a Runtime.
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config_path: Option<String>,
    config: Option<AppConfig>,
    api_key: Option<String>,
}

impl RuntimeBuilder {
    /// Load the server configuration from a YAML file.
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Provide a configuration directly (instead of loading from file).
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Require this bearer key on every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Bind and start serving. Without an explicit configuration the server
    /// listens on a free port on 127.0.0.1.
    pub async fn start(self) -> Result<Runtime> {
        let mut config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => {
                AppConfig::load_from_args(["recallbricks-local", "--config", path.as_str()])
                    .map_err(|e| Error::Config(e.to_string()))?
            }
            (None, None) => {
                let mut config = AppConfig::default();
                config.server.port = 0;
                config
            }
        };
        if let Some(key) = &self.api_key {
            config.security.auth_required = true;
            if !config.security.api_keys.contains(key) {
                config.security.api_keys.push(key.clone());
            }
        }

        let config = Arc::new(config);
        let (addr, handle) = server::spawn(Arc::clone(&config))
            .await
            .map_err(|e| Error::Runtime(e.to_string()))?;

        Ok(Runtime {
            config,
            addr,
            api_key: self.api_key,
            handle,
        })
    }
}
