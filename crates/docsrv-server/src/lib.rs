//! HTTP server for docsrv.
//!
//! docsrv sits behind a static web server. The static server serves built
//! documentation from `{base_folder}/{host}/{version}` and forwards every
//! request it cannot answer to docsrv, which then:
//!
//! - lists the versions of the host's project (`/versions.json`)
//! - redirects `/latest/...` to the newest version
//! - builds a missing version on demand and redirects back to the same URL
//!
//! Release lists come from a [`ReleaseFetcher`] and are refreshed in the
//! background by the [`Indexer`].
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docsrv_build::CommandBuilder;
//! use docsrv_github::GitHubFetcher;
//! use docsrv_server::{run_server, server_config_from_docsrv_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = docsrv_config::Config::load(None, None).unwrap();
//!     let fetcher = Arc::new(GitHubFetcher::new(&config.github.api_url, None, 100));
//!     let builder = Arc::new(CommandBuilder::default());
//!
//!     run_server(server_config_from_docsrv_config(&config), fetcher, builder)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──► static web server ──(miss)──► docsrv (axum)
//!                    ▲                         │
//!                    │                         ├─► Indexer ──► ReleaseFetcher (GitHub)
//!                    │                         │
//!                    └──── built site ◄────────┴─► DocsBuilder (download + make docs)
//! ```

mod app;
mod error;
mod handlers;
mod indexer;
mod request;
mod state;

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use docsrv_build::DocsBuilder;
use docsrv_config::Hosts;
use docsrv_github::ReleaseFetcher;
use state::AppState;
use tokio_util::sync::CancellationToken;

pub use indexer::{IndexError, Indexer};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Root of the static web server.
    pub base_folder: PathBuf,
    /// Assets shared by all builds.
    pub shared_folder: PathBuf,
    /// Upper bound for routing one request, builds included.
    pub request_timeout: Duration,
    /// Interval of the background index refresh.
    pub refresh_interval: Duration,
    /// Token forcing a synchronous re-index.
    pub refresh_token: Option<String>,
    /// Host to project mapping.
    pub hosts: Hosts,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 9091,
            base_folder: PathBuf::from("/var/www/public"),
            shared_folder: PathBuf::from("/etc/shared"),
            request_timeout: Duration::from_secs(300),
            refresh_interval: Duration::from_secs(5 * 60),
            refresh_token: None,
            hosts: Hosts::default(),
        }
    }
}

/// Error starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No host is mapped to a project.
    #[error("no hosts configured")]
    NoHosts,

    /// Bind address is not valid.
    #[error("invalid bind address: {0}")]
    InvalidAddress(#[from] AddrParseError),

    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background indexer task panicked.
    #[error("index refresh task failed: {0}")]
    Indexer(#[from] tokio::task::JoinError),
}

/// Run the server until Ctrl-C.
///
/// Starts the periodic index refresh alongside the HTTP listener and waits
/// for it to stop after the listener shut down.
///
/// # Errors
///
/// Returns an error if no host is configured or the server fails to start.
pub async fn run_server(
    config: ServerConfig,
    fetcher: Arc<dyn ReleaseFetcher>,
    builder: Arc<dyn DocsBuilder>,
) -> Result<(), ServerError> {
    if config.hosts.is_empty() {
        return Err(ServerError::NoHosts);
    }

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, hosts = config.hosts.len(), "Starting server");

    let state = Arc::new(AppState::new(&config, fetcher, builder));

    // Spawned only once the listener is bound so every exit path below joins it.
    let cancel = CancellationToken::new();
    let refresher = tokio::spawn(
        Arc::clone(&state.indexer).run_periodic(config.refresh_interval, cancel.clone()),
    );

    let app = app::create_router(state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    refresher.await?;
    served?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from docsrv config.
#[must_use]
pub fn server_config_from_docsrv_config(config: &docsrv_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        base_folder: config.paths_resolved.base_folder.clone(),
        shared_folder: config.paths_resolved.shared_folder.clone(),
        request_timeout: config.server.request_timeout(),
        refresh_interval: config.index.refresh_interval(),
        refresh_token: config.index.refresh_token.clone(),
        hosts: config.hosts_resolved.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use docsrv_build::MockBuilder;
    use docsrv_config::HostConfig;
    use docsrv_github::MockFetcher;

    use super::*;

    fn config(host: &str, port: u16) -> ServerConfig {
        let mut raw = BTreeMap::new();
        raw.insert(
            "widget.example.com".to_owned(),
            HostConfig {
                repository: "acme/widget".to_owned(),
                min_version: None,
            },
        );
        ServerConfig {
            host: host.to_owned(),
            port,
            hosts: Hosts::from_config(&raw),
            ..ServerConfig::default()
        }
    }

    async fn run(config: ServerConfig) -> Result<(), ServerError> {
        run_server(config, Arc::new(MockFetcher::new()), Arc::new(MockBuilder::new())).await
    }

    #[tokio::test]
    async fn test_run_server_requires_hosts() {
        let config = ServerConfig::default();
        assert!(matches!(run(config).await, Err(ServerError::NoHosts)));
    }

    #[tokio::test]
    async fn test_run_server_returns_on_invalid_address() {
        let err = run(config("not an address", 9091)).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_run_server_returns_when_port_is_taken() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = run(config("127.0.0.1", port)).await.unwrap_err();
        assert!(matches!(err, ServerError::Io(_)), "{err:?}");
    }
}
