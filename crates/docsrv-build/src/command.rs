//! Build by running an external command on the extracted release.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, warn};
use ureq::Agent;

use crate::archive;
use crate::error::BuildError;
use crate::{BuildJob, BuildReport, DocsBuilder};

/// Default download timeout in seconds.
const DEFAULT_DOWNLOAD_TIMEOUT: u64 = 600;

const USER_AGENT: &str = concat!("docsrv/", env!("CARGO_PKG_VERSION"));

/// Downloads the release archive, extracts it and runs a build command.
pub struct CommandBuilder {
    agent: Agent,
    command: Vec<String>,
    temp_root: Option<PathBuf>,
}

impl CommandBuilder {
    /// Create a builder running `command` (program followed by arguments).
    ///
    /// An empty command falls back to `make docs`.
    #[must_use]
    pub fn new(command: Vec<String>, download_timeout: Duration) -> Self {
        let command = if command.is_empty() {
            vec!["make".to_owned(), "docs".to_owned()]
        } else {
            command
        };

        let agent = Agent::config_builder()
            .timeout_global(Some(download_timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            command,
            temp_root: None,
        }
    }

    /// Create temporary build directories under `root` instead of the
    /// system temp directory.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn command_line(&self) -> String {
        self.command.join(" ")
    }

    fn temp_dir(&self) -> Result<TempDir, BuildError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docsrv-");
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(BuildError::TempDir)
    }

    /// Stream the archive at `url` into `path`.
    fn download(&self, url: &str, path: &Path) -> Result<(), BuildError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|source| BuildError::Fetch {
                url: url.to_owned(),
                source,
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(BuildError::FetchStatus {
                url: url.to_owned(),
                status,
            });
        }

        let mut reader = response.into_body().into_reader();
        File::create(path)
            .and_then(|mut file| io::copy(&mut reader, &mut file))
            .map_err(|source| BuildError::Download {
                url: url.to_owned(),
                source,
            })?;
        Ok(())
    }

    fn run(&self, job: &BuildJob, tree: &Path) -> Result<String, BuildError> {
        let (program, args) = self
            .command
            .split_first()
            .map_or(("make", &[][..]), |(p, a)| (p.as_str(), a));

        let output = Command::new(program)
            .args(args)
            .current_dir(tree)
            .envs(job.env())
            .output()
            .map_err(|source| BuildError::Spawn {
                command: self.command_line(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(BuildError::Failed {
                command: self.command_line(),
                status: output.status.to_string(),
                output: combined,
            });
        }
        Ok(combined)
    }

    fn build_in(&self, job: &BuildJob, dir: &Path) -> Result<(String, Duration), BuildError> {
        let archive_path = dir.join("source.tar.gz");
        self.download(&job.source_url, &archive_path)?;

        let source_dir = dir.join("source");
        let tree = archive::extract_file(&archive_path, &source_dir)
            .and_then(|()| archive::working_tree(&source_dir))
            .map_err(|source| BuildError::Extract {
                url: job.source_url.clone(),
                source,
            })?;

        let started = Instant::now();
        let output = self.run(job, &tree)?;
        Ok((output, started.elapsed()))
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(Vec::new(), Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT))
    }
}

impl DocsBuilder for CommandBuilder {
    fn build(&self, job: &BuildJob) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let dir = self.temp_dir()?;
        debug!(
            owner = %job.owner,
            project = %job.project,
            version = %job.version,
            dir = %dir.path().display(),
            "Building documentation"
        );

        let result = self.build_in(job, dir.path());

        let path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!(dir = %path.display(), error = %e, "Could not delete temporary build files");
        }

        let (output, build) = result?;
        Ok(BuildReport {
            output,
            total: started.elapsed(),
            build,
        })
    }
}
