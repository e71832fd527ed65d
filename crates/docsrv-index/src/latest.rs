//! Time-bounded cache of the latest version per project.
//!
//! An entry is fresh while `now < cached_at + ttl`. Stale entries stay in
//! the map until overwritten but are reported as absent, which forces the
//! caller to recompute the latest release.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::release::{ProjectKey, parse_version};

/// How long a resolved latest version is trusted.
pub const LATEST_VERSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CachedLatest {
    tag: String,
    cached_at: Instant,
}

/// Concurrent latest-version cache.
#[derive(Debug)]
pub struct LatestCache {
    entries: RwLock<HashMap<ProjectKey, CachedLatest>>,
    ttl: Duration,
}

impl Default for LatestCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestCache {
    /// Create a cache with the standard one hour lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(LATEST_VERSION_TTL)
    }

    /// Create a cache with a custom entry lifetime.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_fresh(&self, entry: &CachedLatest, now: Instant) -> bool {
        entry
            .cached_at
            .checked_add(self.ttl)
            .is_none_or(|expires| now < expires)
    }

    /// Cached latest tag, if a fresh entry exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn get(&self, key: &ProjectKey) -> Option<String> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        self.is_fresh(entry, Instant::now())
            .then(|| entry.tag.clone())
    }

    /// Unconditionally store `tag` with a fresh timestamp.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn set(&self, key: &ProjectKey, tag: &str) {
        self.entries.write().unwrap().insert(
            key.clone(),
            CachedLatest {
                tag: tag.to_owned(),
                cached_at: Instant::now(),
            },
        );
    }

    /// Advance the cached tag to `tag` if it is strictly greater.
    ///
    /// Only updates an existing fresh entry: the first value must come from
    /// [`LatestCache::set`]. Equal versions and tags that do not parse leave
    /// the entry untouched. Returns whether the entry changed.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn try_set(&self, key: &ProjectKey, tag: &str) -> bool {
        let Some(candidate) = parse_version(tag) else {
            return false;
        };

        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        if !self.is_fresh(entry, now) {
            return false;
        }
        let Some(current) = parse_version(&entry.tag) else {
            return false;
        };
        if candidate.cmp_precedence(&current).is_le() {
            return false;
        }

        tracing::debug!(
            owner = %key.owner,
            project = %key.project,
            from = %entry.tag,
            to = tag,
            "Advanced latest version"
        );
        *entry = CachedLatest {
            tag: tag.to_owned(),
            cached_at: now,
        };
        true
    }
}
