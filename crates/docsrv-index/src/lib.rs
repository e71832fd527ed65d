//! In-memory release index for docsrv.
//!
//! This crate holds the shared state consulted on every request:
//!
//! - [`ReleaseStore`]: known releases per project, sorted by semantic version
//! - [`InstallTracker`]: which `(project, version)` pairs have been built
//! - [`LatestCache`]: time-bounded cache of the resolved "latest" tag
//!
//! Each store owns its own reader/writer lock, so a request touching one
//! store never waits on writers of another.
//!
//! # Example
//!
//! ```
//! use docsrv_index::{ProjectKey, Release, ReleaseStore};
//!
//! let store = ReleaseStore::new();
//! let key = ProjectKey::new("acme", "widget");
//! let releases = vec![
//!     Release::new("v2.0.0", "https://example.com/v2.tar.gz").unwrap(),
//!     Release::new("v1.0.0", "https://example.com/v1.tar.gz").unwrap(),
//! ];
//! store.set(&key, releases);
//!
//! let tags: Vec<_> = store.for_project(&key).iter().map(|r| r.tag().to_owned()).collect();
//! assert_eq!(tags, ["v1.0.0", "v2.0.0"]);
//! ```

mod installed;
mod latest;
mod release;
mod store;

pub use installed::InstallTracker;
pub use latest::{LATEST_VERSION_TTL, LatestCache};
pub use release::{InvalidVersion, ProjectKey, Release, parse_version};
pub use store::{ReleaseSet, ReleaseStore};
