//! Mock builder for testing.

use std::fs;
use std::sync::RwLock;
use std::thread;
use std::time::Duration;

use crate::error::BuildError;
use crate::{BuildJob, BuildReport, DocsBuilder};

/// Builder that records jobs instead of running them.
///
/// On success an `index.html` naming the version is written into the
/// destination so tests can observe the installed site.
#[derive(Debug, Default)]
pub struct MockBuilder {
    jobs: RwLock<Vec<BuildJob>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MockBuilder {
    /// Create a mock that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every build.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every build with [`BuildError::Failed`].
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Jobs received so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn jobs(&self) -> Vec<BuildJob> {
        self.jobs.read().unwrap().clone()
    }

    /// Number of builds attempted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.jobs.read().unwrap().len()
    }
}

impl DocsBuilder for MockBuilder {
    fn build(&self, job: &BuildJob) -> Result<BuildReport, BuildError> {
        self.jobs.write().unwrap().push(job.clone());

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        if self.fail {
            return Err(BuildError::Failed {
                command: "mock".to_owned(),
                status: "exit status: 1".to_owned(),
                output: format!("mock build of {} failed", job.version),
            });
        }

        fs::create_dir_all(&job.destination)
            .and_then(|()| {
                fs::write(
                    job.destination.join("index.html"),
                    format!("{} {}", job.project, job.version),
                )
            })
            .map_err(|source| BuildError::Spawn {
                command: "mock".to_owned(),
                source,
            })?;

        Ok(BuildReport {
            output: format!("built {}", job.version),
            ..BuildReport::default()
        })
    }
}
