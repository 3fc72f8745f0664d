//! # caddy-orchestrator-admin
//!
//! Client for the admin API of a Caddy server, plus a typed model of the
//! JSON configuration document that API accepts.
//!
//! ## Endpoints used
//!
//! | Operation | Request | Success |
//! |-----------|---------|---------|
//! | [`AdminApi::fetch_config`] | `GET /config/` | 2xx, JSON body |
//! | [`AdminApi::apply_config`] | `POST /load` | 2xx |
//! | [`AdminApi::health`] | `GET /config/admin` | any 2xx |
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use caddy_orchestrator_admin::{create_admin_client, AdminApi, CaddyConfig, ClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = create_admin_client("http://localhost:2019", &ClientOptions::default())?;
//!
//!     client.health().await?;
//!     let live = client.fetch_config().await?;
//!     println!("live config: {live}");
//!
//!     // Serve nothing, keep the admin endpoint.
//!     client.apply_config(&CaddyConfig::admin_only()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, AdminError>`](AdminError):
//!
//! - [`AdminError::Transport`] / [`AdminError::Timeout`]: no response
//! - [`AdminError::Upstream`]: a read answered with a non-2xx status
//! - [`AdminError::ApplyRejected`]: the instance refused a config load
//!
//! The client performs no retries.

mod client;
mod error;
mod factory;
mod http_client;
mod traits;
mod types;
mod utils;

pub use error::{AdminError, Result};

pub use factory::{create_admin_client, normalize_admin_url};

pub use traits::AdminApi;

pub use types::{
    ADMIN_LISTEN_ADDRESS, AdminConfig, Apps, CaddyConfig, CaddyRoute, ClientOptions,
    DEFAULT_LISTEN, DEFAULT_SERVER_NAME, Empty, Handler, HeaderOps, HttpApp, HttpServer,
    LoadBalancing, MatcherSet, ProxyHeaders, SelectionPolicy, Upstream,
};

pub use client::CaddyAdminClient;

pub use utils::log_sanitizer;
