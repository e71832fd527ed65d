//! Release fetching for docsrv.
//!
//! This crate provides a [`ReleaseFetcher`] trait that abstracts where the
//! release list of a project comes from, with:
//!
//! - [`GitHubFetcher`] listing releases through the GitHub REST API
//! - [`MockFetcher`] for testing (behind `mock` feature flag)
//!
//! Every implementation returns the same shape: drafts, pre-releases and
//! tags that are not semantic versions are dropped, releases below the
//! optional minimum version are dropped, and the result is sorted ascending.
//! [`select_releases`] implements that filtering once for all backends.

mod client;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod select;

use docsrv_index::{ProjectKey, Release};
use semver::Version;

pub use client::GitHubFetcher;
pub use error::FetchError;
#[cfg(feature = "mock")]
pub use mock::MockFetcher;
pub use select::{ReleaseCandidate, select_releases};

/// Source of a project's published releases.
///
/// Implementations block on network I/O; async callers should run them on
/// a blocking thread pool.
pub trait ReleaseFetcher: Send + Sync {
    /// All published releases of `key`, sorted ascending by version.
    ///
    /// Pagination is handled internally.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the release API cannot be reached or
    /// answers with an error status.
    fn releases(
        &self,
        key: &ProjectKey,
        min_version: Option<&Version>,
    ) -> Result<Vec<Release>, FetchError>;
}
