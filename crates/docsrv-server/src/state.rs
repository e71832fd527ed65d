//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docsrv_build::DocsBuilder;
use docsrv_config::Hosts;
use docsrv_github::ReleaseFetcher;
use docsrv_index::{InstallTracker, LatestCache, ReleaseStore};

use crate::ServerConfig;
use crate::indexer::Indexer;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Host to project mapping.
    pub(crate) hosts: Arc<Hosts>,
    /// Known releases per project.
    pub(crate) store: Arc<ReleaseStore>,
    /// Versions already built.
    pub(crate) installed: InstallTracker,
    /// Resolved latest tag per project.
    pub(crate) latest: LatestCache,
    /// Release indexer shared with the periodic refresh task.
    pub(crate) indexer: Arc<Indexer>,
    /// Documentation builder.
    pub(crate) builder: Arc<dyn DocsBuilder>,
    /// Root of the static web server.
    pub(crate) base_folder: PathBuf,
    /// Assets shared by all builds.
    pub(crate) shared_folder: PathBuf,
    /// Upper bound for routing one request.
    pub(crate) request_timeout: Duration,
}

impl AppState {
    pub(crate) fn new(
        config: &ServerConfig,
        fetcher: Arc<dyn ReleaseFetcher>,
        builder: Arc<dyn DocsBuilder>,
    ) -> Self {
        let hosts = Arc::new(config.hosts.clone());
        let store = Arc::new(ReleaseStore::new());
        let indexer = Arc::new(Indexer::new(
            Arc::clone(&store),
            fetcher,
            Arc::clone(&hosts),
            config.refresh_token.clone(),
        ));

        Self {
            hosts,
            store,
            installed: InstallTracker::new(),
            latest: LatestCache::new(),
            indexer,
            builder,
            base_folder: config.base_folder.clone(),
            shared_folder: config.shared_folder.clone(),
            request_timeout: config.request_timeout,
        }
    }
}
