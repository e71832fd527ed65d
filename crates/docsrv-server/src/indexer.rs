//! Release indexing.
//!
//! Projects are indexed lazily on their first request and then kept fresh
//! by a periodic background refresh. A request carrying the configured
//! refresh token forces a synchronous re-fetch, so a release pipeline can
//! make a new version visible right after publishing it.

use std::sync::Arc;
use std::time::Duration;

use docsrv_config::Hosts;
use docsrv_github::{FetchError, ReleaseFetcher};
use docsrv_index::{ProjectKey, ReleaseStore};
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Error while indexing a project.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Release API failure.
    #[error("failed to fetch releases")]
    Fetch(#[from] FetchError),

    /// Blocking fetch task panicked or was cancelled.
    #[error("release fetch task failed")]
    Task(#[from] JoinError),
}

/// Keeps the release store in sync with the upstream release API.
pub struct Indexer {
    store: Arc<ReleaseStore>,
    fetcher: Arc<dyn ReleaseFetcher>,
    hosts: Arc<Hosts>,
    refresh_token: Option<String>,
}

impl Indexer {
    /// Create an indexer writing into `store`.
    ///
    /// An empty refresh token is treated as no token.
    pub fn new(
        store: Arc<ReleaseStore>,
        fetcher: Arc<dyn ReleaseFetcher>,
        hosts: Arc<Hosts>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            store,
            fetcher,
            hosts,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
        }
    }

    /// Whether `token` matches the configured refresh token.
    ///
    /// A non-matching, non-empty token is logged without its value.
    pub fn accepts_token(&self, token: Option<&str>) -> bool {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return false;
        };
        if self.refresh_token.as_deref() == Some(token) {
            return true;
        }
        tracing::warn!("A refresh token was given, but it is not valid");
        false
    }

    /// Index `key` unless it already is.
    pub async fn ensure_indexed(&self, key: &ProjectKey) -> Result<(), IndexError> {
        if self.store.is_indexed(key) {
            return Ok(());
        }
        self.refresh_one(key).await.map(|_| ())
    }

    /// Re-fetch the releases of `key` and replace its release list.
    ///
    /// Returns the number of releases stored.
    pub async fn refresh_one(&self, key: &ProjectKey) -> Result<usize, IndexError> {
        let fetcher = Arc::clone(&self.fetcher);
        let min_version = self.hosts.min_version_for(key);
        let fetch_key = key.clone();

        let releases = tokio::task::spawn_blocking(move || {
            fetcher.releases(&fetch_key, min_version.as_ref())
        })
        .await??;

        let count = releases.len();
        self.store.set(key, releases);
        Ok(count)
    }

    /// Index `key` for a request, honoring the refresh-token bypass.
    ///
    /// Returns whether a forced refresh happened.
    pub async fn prepare(&self, key: &ProjectKey, token: Option<&str>) -> Result<bool, IndexError> {
        if self.accepts_token(token) {
            tracing::debug!(owner = %key.owner, project = %key.project, "Refresh token accepted, re-indexing");
            self.refresh_one(key).await?;
            return Ok(true);
        }
        self.ensure_indexed(key).await?;
        Ok(false)
    }

    /// Refresh every project currently in the store.
    ///
    /// A failure for one project is logged and does not stop the pass.
    /// Returns the number of projects refreshed successfully.
    pub async fn refresh_all(&self) -> usize {
        let mut refreshed = 0;
        for key in self.store.projects() {
            match self.refresh_one(&key).await {
                Ok(_) => refreshed += 1,
                Err(e) => {
                    tracing::error!(
                        owner = %key.owner,
                        project = %key.project,
                        error = %e,
                        "Error refreshing project"
                    );
                }
            }
        }
        refreshed
    }

    /// Refresh all projects every `interval` until `cancel` fires.
    pub async fn run_periodic(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "Periodic index refresh started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let refreshed = self.refresh_all().await;
                    tracing::debug!(projects = refreshed, "Index refresh pass complete");
                }
            }
        }

        tracing::info!("Periodic index refresh stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use docsrv_config::HostConfig;
    use docsrv_github::MockFetcher;
    use docsrv_index::Release;
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup(token: Option<&str>) -> (Arc<ReleaseStore>, Arc<MockFetcher>, Indexer) {
        let mut raw = BTreeMap::new();
        raw.insert(
            "widget.example.com".to_owned(),
            HostConfig {
                repository: "acme/widget".to_owned(),
                min_version: Some("v1.0.0".to_owned()),
            },
        );
        let hosts = Arc::new(Hosts::from_config(&raw));
        let store = Arc::new(ReleaseStore::new());
        let fetcher = Arc::new(MockFetcher::new());
        let indexer = Indexer::new(
            Arc::clone(&store),
            Arc::clone(&fetcher) as Arc<dyn ReleaseFetcher>,
            hosts,
            token.map(str::to_owned),
        );
        (store, fetcher, indexer)
    }

    fn key() -> ProjectKey {
        ProjectKey::new("acme", "widget")
    }

    fn tags(store: &ReleaseStore) -> Vec<String> {
        store
            .for_project(&key())
            .iter()
            .map(|r| r.tag().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_ensure_indexed_fetches_once() {
        let (store, fetcher, indexer) = setup(None);
        fetcher.add(&key(), "v1.0.0", "u1");

        indexer.ensure_indexed(&key()).await.unwrap();
        indexer.ensure_indexed(&key()).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(tags(&store), vec!["v1.0.0"]);
    }

    #[tokio::test]
    async fn test_refresh_one_applies_min_version() {
        let (store, fetcher, indexer) = setup(None);
        fetcher.add(&key(), "v0.9.0", "u0");
        fetcher.add(&key(), "v1.2.0", "u2");

        assert_eq!(indexer.refresh_one(&key()).await.unwrap(), 1);
        assert_eq!(tags(&store), vec!["v1.2.0"]);
    }

    #[tokio::test]
    async fn test_prepare_with_token_forces_refresh() {
        let (store, fetcher, indexer) = setup(Some("s3cret"));
        fetcher.add(&key(), "v1.0.0", "u1");
        indexer.ensure_indexed(&key()).await.unwrap();

        fetcher.add(&key(), "v1.1.0", "u2");
        assert!(!indexer.prepare(&key(), Some("wrong")).await.unwrap());
        assert_eq!(tags(&store), vec!["v1.0.0"]);

        assert!(indexer.prepare(&key(), Some("s3cret")).await.unwrap());
        assert_eq!(tags(&store), vec!["v1.0.0", "v1.1.0"]);
        assert_eq!(fetcher.calls(), 2);
    }

    #[test]
    fn test_accepts_token() {
        let (_, _, indexer) = setup(Some("s3cret"));
        assert!(indexer.accepts_token(Some("s3cret")));
        assert!(!indexer.accepts_token(Some("nope")));
        assert!(!indexer.accepts_token(Some("")));
        assert!(!indexer.accepts_token(None));

        let (_, _, open) = setup(Some(""));
        assert!(!open.accepts_token(Some("")));
    }

    #[tokio::test]
    async fn test_refresh_all_survives_failures() {
        let (store, fetcher, indexer) = setup(None);
        let other = ProjectKey::new("acme", "gadget");
        store.set(&key(), vec![]);
        store.set(&other, vec![Release::new("v1.0.0", "old").unwrap()]);
        fetcher.add(&key(), "v1.0.0", "u1");
        fetcher.set_failing(&other, true);

        assert_eq!(indexer.refresh_all().await, 1);
        assert_eq!(tags(&store), vec!["v1.0.0"]);
        // failed refresh keeps the previous generation
        assert_eq!(store.for_project(&other).len(), 1);
    }

    #[tokio::test]
    async fn test_run_periodic_stops_on_cancel() {
        let (store, fetcher, indexer) = setup(None);
        store.set(&key(), vec![]);
        fetcher.add(&key(), "v1.0.0", "u1");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            Arc::new(indexer).run_periodic(Duration::from_millis(10), cancel.clone()),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.unwrap();

        assert!(fetcher.calls() >= 1);
        assert_eq!(tags(&store), vec!["v1.0.0"]);
    }
}
