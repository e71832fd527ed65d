//! `docsrv releases` command implementation.

use std::path::PathBuf;

use clap::Args;
use docsrv_config::{CliSettings, Config};
use docsrv_github::{GitHubFetcher, ReleaseFetcher};
use docsrv_index::{ProjectKey, parse_version};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the releases command.
#[derive(Args)]
pub(crate) struct ReleasesArgs {
    /// Repository in the form `owner/project`.
    repository: String,

    /// Only list releases at or above this version.
    #[arg(long)]
    min_version: Option<String>,

    /// Path to configuration file (default: auto-discover docsrv.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GitHub API key used to list releases (overrides config).
    #[arg(long, env = "GITHUB_API_KEY", hide_env_values = true)]
    github_api_key: Option<String>,
}

impl ReleasesArgs {
    /// Execute the releases command.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the release API
    /// fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let key = ProjectKey::parse(&self.repository).ok_or_else(|| {
            CliError::Validation(format!(
                "invalid repository {:?}, expected owner/project",
                self.repository
            ))
        })?;

        let min_version = self
            .min_version
            .as_deref()
            .map(|raw| {
                parse_version(raw)
                    .ok_or_else(|| CliError::Validation(format!("invalid min version {raw:?}")))
            })
            .transpose()?;

        let cli_settings = CliSettings {
            github_api_key: self.github_api_key,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let fetcher = GitHubFetcher::new(
            &config.github.api_url,
            config.github.api_key.clone(),
            config.github.per_page,
        );
        let releases = fetcher.releases(&key, min_version.as_ref())?;

        output.highlight(&format!("{key}: {} release(s)", releases.len()));
        for release in &releases {
            output.info(&format!("{:<16} {}", release.tag(), release.source_url()));
        }

        Ok(())
    }
}
