//! Rust SDK for RecallBricks
//!
//! This SDK provides two usage modes:
//!
//! # HTTP Client (default feature)
//!
//! Talk to a hosted service or a local server over the REST API:
//!
//! ```rust,no_run
//! use recallbricks::{Client, SearchOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_env()?;
//!
//!     let memory = client
//!         .memories()
//!         .create("User prefers dark mode", json!({"category": "preferences"}))
//!         .await?;
//!     println!("Stored {}", memory.id);
//!
//!     let results = client
//!         .memories()
//!         .search("dark mode", SearchOptions::new().limit(3))
//!         .await?;
//!     for result in results {
//!         println!("{:.2} {}", result.score, result.memory.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Embedded Runtime (feature = "embedded")
//!
//! Run the in-memory `recallbricks-local` server inside your process, e.g.
//! for tests or offline demos:
//!
//! ```rust,ignore
//! use recallbricks::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Runtime::builder().api_key("rb_local").start().await?;
//!     let client = runtime.client()?;
//!     let page = client.memories().list(Default::default()).await?;
//!     println!("{} memories", page.pagination.total);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod types;

#[cfg(feature = "http-client")]
pub mod client;

#[cfg(feature = "embedded")]
pub mod runtime;

// Re-exports
pub use error::{Error, Result};
pub use types::*;

#[cfg(feature = "http-client")]
pub use client::Client;

#[cfg(feature = "embedded")]
pub use runtime::Runtime;
