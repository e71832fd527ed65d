//! `docsrv serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args};
use docsrv_build::CommandBuilder;
use docsrv_config::{CliSettings, Config};
use docsrv_github::GitHubFetcher;
use docsrv_server::{run_server, server_config_from_docsrv_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover docsrv.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// GitHub API key used to list releases (overrides config).
    #[arg(long, env = "GITHUB_API_KEY", hide_env_values = true)]
    github_api_key: Option<String>,

    /// Token that forces re-indexing when passed as `?token=` (overrides config).
    #[arg(long, env = "REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// Minutes between background index refreshes (overrides config).
    ///
    /// A value that is not a number is ignored.
    #[arg(long, env = "DOCSRV_REFRESH")]
    refresh_interval: Option<String>,

    /// Root folder of the static web server (overrides config).
    #[arg(long)]
    base_folder: Option<PathBuf>,

    /// Folder with assets shared by all builds (overrides config).
    #[arg(long)]
    shared_folder: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(
        short,
        long,
        env = "DEBUG_LOG",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub verbose: bool,
}

impl ServeArgs {
    /// Refresh interval override in minutes, if it parses.
    fn refresh_minutes(&self) -> Option<u64> {
        let raw = self.refresh_interval.as_deref()?.trim();
        match raw.parse() {
            Ok(minutes) => Some(minutes),
            Err(_) => {
                tracing::warn!(value = raw, "Ignoring refresh interval that is not a number");
                None
            }
        }
    }

    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, no host is mapped, or the
    /// server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let refresh_interval = self.refresh_minutes();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            github_api_key: self.github_api_key,
            refresh_token: self.refresh_token,
            refresh_interval,
            base_folder: self.base_folder,
            shared_folder: self.shared_folder,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if config.hosts_resolved.is_empty() {
            return Err(CliError::Validation(
                "no hosts configured, add [hosts.\"<host>\"] entries to docsrv.toml".to_owned(),
            ));
        }

        print_startup_info(&output, &config);

        let fetcher = Arc::new(GitHubFetcher::new(
            &config.github.api_url,
            config.github.api_key.clone(),
            config.github.per_page,
        ));
        let builder = Arc::new(CommandBuilder::new(
            config.build.command.clone(),
            Duration::from_secs(config.build.download_timeout),
        ));

        run_server(server_config_from_docsrv_config(&config), fetcher, builder).await?;

        Ok(())
    }
}

fn print_startup_info(output: &Output, config: &Config) {
    output.info(&format!(
        "Starting server on {}:{}",
        config.server.host, config.server.port
    ));
    output.info(&format!(
        "Base folder: {}",
        config.paths_resolved.base_folder.display()
    ));
    output.info(&format!(
        "Shared folder: {}",
        config.paths_resolved.shared_folder.display()
    ));
    output.info(&format!(
        "Index refresh: every {} min",
        config.index.refresh_interval().as_secs() / 60
    ));
    output.info(&format!("Build command: {}", config.build.command.join(" ")));

    let mut hosts: Vec<_> = config.hosts_resolved.iter().collect();
    hosts.sort_unstable();
    for (host, project) in hosts {
        output.highlight(&format!("  {host} -> {project}"));
    }

    if config.github.api_key.is_none() {
        output.warning("No GitHub API key configured, release listing is rate limited");
    }
    if config.index.refresh_token.is_none() {
        output.info("Refresh token: disabled");
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        Wrapper::try_parse_from(std::iter::once("serve").chain(args.iter().copied()))
            .unwrap()
            .serve
    }

    #[test]
    fn test_refresh_minutes_parses_number() {
        let args = parse(&["--refresh-interval", "15"]);
        assert_eq!(args.refresh_minutes(), Some(15));
    }

    #[test]
    fn test_refresh_minutes_ignores_garbage() {
        let args = parse(&["--refresh-interval", "soon"]);
        assert_eq!(args.refresh_minutes(), None);
    }

    #[test]
    fn test_verbose_flag() {
        assert!(parse(&["--verbose"]).verbose);
        assert!(parse(&["-v"]).verbose);
    }

    #[test]
    fn test_env_values_from_deployments_are_accepted() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DEBUG_LOG", "1");
            std::env::set_var("DOCSRV_REFRESH", "not-a-number");
        }

        let parsed = Wrapper::try_parse_from(["serve"]);

        unsafe {
            std::env::remove_var("DEBUG_LOG");
            std::env::remove_var("DOCSRV_REFRESH");
        }

        let args = parsed.unwrap().serve;
        assert!(args.verbose);
        assert_eq!(args.refresh_minutes(), None);
    }
}
