//! Per-project release lists.
//!
//! # Thread Safety
//!
//! [`ReleaseStore`] keeps one `RwLock<HashMap<ProjectKey, Arc<ReleaseSet>>>`.
//! A [`ReleaseSet`] bundles the sorted list with its by-tag index, so
//! replacing a project's releases is a single pointer swap and readers never
//! see a list from one generation paired with an index from another.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::release::{ProjectKey, Release};

/// One generation of a project's releases.
#[derive(Debug, Default)]
pub struct ReleaseSet {
    releases: Vec<Release>,
    by_tag: HashMap<String, usize>,
}

impl ReleaseSet {
    /// Build a set sorted ascending by version, keeping the last release
    /// seen for a duplicated tag.
    #[must_use]
    pub fn new(releases: Vec<Release>) -> Self {
        let mut unique: HashMap<String, Release> = HashMap::with_capacity(releases.len());
        for release in releases {
            unique.insert(release.tag().to_owned(), release);
        }

        let mut releases: Vec<Release> = unique.into_values().collect();
        releases.sort_by(|a, b| a.cmp_version(b).then_with(|| a.tag().cmp(b.tag())));

        let by_tag = releases
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.tag().to_owned(), idx))
            .collect();

        Self { releases, by_tag }
    }

    /// Releases sorted ascending by semantic version.
    #[must_use]
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Look up a release by its exact tag.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Release> {
        self.by_tag.get(tag).map(|&idx| &self.releases[idx])
    }

    /// Release with the greatest version.
    #[must_use]
    pub fn latest(&self) -> Option<&Release> {
        self.releases.last()
    }

    /// Number of releases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Whether the set has no releases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

/// Concurrent map from project to its current [`ReleaseSet`].
#[derive(Debug, Default)]
pub struct ReleaseStore {
    projects: RwLock<HashMap<ProjectKey, Arc<ReleaseSet>>>,
}

impl ReleaseStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all releases of a project.
    ///
    /// The previous generation is dropped entirely; nothing is merged.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn set(&self, key: &ProjectKey, releases: Vec<Release>) {
        let set = Arc::new(ReleaseSet::new(releases));
        tracing::debug!(owner = %key.owner, project = %key.project, count = set.len(), "Indexed releases");
        self.projects.write().unwrap().insert(key.clone(), set);
    }

    /// Current release set of a project, if it was ever indexed.
    ///
    /// The returned snapshot stays consistent even if the project is
    /// re-indexed while it is held.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn snapshot(&self, key: &ProjectKey) -> Option<Arc<ReleaseSet>> {
        self.projects.read().unwrap().get(key).cloned()
    }

    /// Look up a release by exact tag.
    #[must_use]
    pub fn get(&self, key: &ProjectKey, tag: &str) -> Option<Release> {
        self.snapshot(key)?.get(tag).cloned()
    }

    /// Releases of a project sorted ascending, empty if never indexed.
    #[must_use]
    pub fn for_project(&self, key: &ProjectKey) -> Vec<Release> {
        self.snapshot(key)
            .map(|set| set.releases().to_vec())
            .unwrap_or_default()
    }

    /// Whether the project has been indexed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn is_indexed(&self, key: &ProjectKey) -> bool {
        self.projects.read().unwrap().contains_key(key)
    }

    /// All indexed projects.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn projects(&self) -> Vec<ProjectKey> {
        self.projects.read().unwrap().keys().cloned().collect()
    }
}
