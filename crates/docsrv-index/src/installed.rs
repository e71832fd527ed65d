//! Record of built documentation versions.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::release::ProjectKey;

/// Set of `(project, version)` pairs whose documentation is on disk.
///
/// Entries are never removed for the lifetime of the process. No I/O
/// happens under the lock.
#[derive(Debug, Default)]
pub struct InstallTracker {
    installed: RwLock<HashSet<(ProjectKey, String)>>,
}

impl InstallTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the version has been built.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn is_installed(&self, key: &ProjectKey, version: &str) -> bool {
        self.installed
            .read()
            .unwrap()
            .contains(&(key.clone(), version.to_owned()))
    }

    /// Mark the version as built. Marking twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn mark_installed(&self, key: &ProjectKey, version: &str) {
        let inserted = self
            .installed
            .write()
            .unwrap()
            .insert((key.clone(), version.to_owned()));
        if inserted {
            tracing::debug!(owner = %key.owner, project = %key.project, version, "Marked installed");
        }
    }
}
