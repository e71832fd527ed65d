//! Documentation builds for docsrv.
//!
//! A build turns one release of a project into a static documentation site:
//! the release's source archive is downloaded and extracted into a
//! temporary directory, and an external build command (by default
//! `make docs`) is run inside the extracted tree. The command receives
//! everything it needs through environment variables, see
//! [`BuildJob::env`].
//!
//! [`DocsBuilder`] abstracts the build so the HTTP layer can be tested
//! without network or subprocess I/O:
//!
//! - [`CommandBuilder`] downloads, extracts and runs the command
//! - [`MockBuilder`] records jobs (behind `mock` feature flag)

mod archive;
mod command;
mod error;
#[cfg(feature = "mock")]
mod mock;

use std::path::PathBuf;
use std::time::Duration;

pub use command::CommandBuilder;
pub use error::BuildError;
#[cfg(feature = "mock")]
pub use mock::MockBuilder;

/// Everything needed to build one version of a project's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    /// URL of the `.tar.gz` source archive.
    pub source_url: String,
    /// Public URL the site is served under, with a trailing slash.
    pub base_url: String,
    /// Directory the build command writes the site into.
    pub destination: PathBuf,
    /// Directory with assets shared by all builds.
    pub shared_folder: PathBuf,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub project: String,
    /// Release tag being built.
    pub version: String,
    /// Host the site is served on, without port.
    pub host_name: String,
}

impl BuildJob {
    /// Environment variables passed to the build command.
    #[must_use]
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("BASE_URL", self.base_url.clone()),
            ("DESTINATION_PATH", self.destination.display().to_string()),
            ("SHARED_PATH", self.shared_folder.display().to_string()),
            ("REPOSITORY_NAME", self.project.clone()),
            ("REPOSITORY_OWNER", self.owner.clone()),
            ("VERSION_NAME", self.version.clone()),
            ("HOST_NAME", self.host_name.clone()),
            ("DOCSRV", "true".to_owned()),
        ]
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Combined stdout and stderr of the build command.
    pub output: String,
    /// Wall time including download and extraction.
    pub total: Duration,
    /// Wall time of the build command alone.
    pub build: Duration,
}

/// Builds a documentation site from a release.
///
/// Builds block on network, disk and subprocess I/O; async callers should
/// run them on a blocking thread pool.
pub trait DocsBuilder: Send + Sync {
    /// Build `job` into `job.destination`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the archive cannot be fetched or
    /// extracted, or the build command fails.
    fn build(&self, job: &BuildJob) -> Result<BuildReport, BuildError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_job_env() {
        let job = BuildJob {
            source_url: "https://example.com/v1.0.0.tar.gz".to_owned(),
            base_url: "http://docs.example.com/v1.0.0/".to_owned(),
            destination: PathBuf::from("/var/www/public/docs.example.com/v1.0.0"),
            shared_folder: PathBuf::from("/etc/shared"),
            owner: "acme".to_owned(),
            project: "widget".to_owned(),
            version: "v1.0.0".to_owned(),
            host_name: "docs.example.com".to_owned(),
        };

        assert_eq!(
            job.env(),
            vec![
                ("BASE_URL", "http://docs.example.com/v1.0.0/".to_owned()),
                (
                    "DESTINATION_PATH",
                    "/var/www/public/docs.example.com/v1.0.0".to_owned()
                ),
                ("SHARED_PATH", "/etc/shared".to_owned()),
                ("REPOSITORY_NAME", "widget".to_owned()),
                ("REPOSITORY_OWNER", "acme".to_owned()),
                ("VERSION_NAME", "v1.0.0".to_owned()),
                ("HOST_NAME", "docs.example.com".to_owned()),
                ("DOCSRV", "true".to_owned()),
            ]
        );
    }
}
