//! Mock release fetcher for testing.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use docsrv_index::{ProjectKey, Release};
use semver::Version;

use crate::error::FetchError;
use crate::select::{ReleaseCandidate, select_releases};
use crate::ReleaseFetcher;

/// In-memory release fetcher.
///
/// Applies the same filtering as the real fetcher and counts calls so tests
/// can assert when the upstream API would have been hit.
#[derive(Debug, Default)]
pub struct MockFetcher {
    releases: RwLock<HashMap<ProjectKey, Vec<ReleaseCandidate>>>,
    failing: RwLock<HashSet<ProjectKey>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a published release.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add(&self, key: &ProjectKey, tag: &str, source_url: &str) {
        self.add_candidate(key, ReleaseCandidate::published(tag, source_url));
    }

    /// Add a raw candidate (draft, pre-release, ...).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add_candidate(&self, key: &ProjectKey, candidate: ReleaseCandidate) {
        self.releases
            .write()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .push(candidate);
    }

    /// Make subsequent calls for `key` fail (or succeed again).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_failing(&self, key: &ProjectKey, failing: bool) {
        let mut set = self.failing.write().unwrap();
        if failing {
            set.insert(key.clone());
        } else {
            set.remove(key);
        }
    }

    /// Number of `releases` calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReleaseFetcher for MockFetcher {
    fn releases(
        &self,
        key: &ProjectKey,
        min_version: Option<&Version>,
    ) -> Result<Vec<Release>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.read().unwrap().contains(key) {
            return Err(FetchError::HttpResponse {
                status: 503,
                body: format!("mock failure for {key}"),
            });
        }

        let candidates = self
            .releases
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default();
        Ok(select_releases(candidates, min_version))
    }
}
