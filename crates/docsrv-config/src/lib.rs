//! Configuration management for docsrv.
//!
//! Parses `docsrv.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. A missing file is
//! not an error: the defaults with an empty host mapping are used.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `github.api_key`
//! - `index.refresh_token`

mod expand;
mod hosts;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub use hosts::{HostConfig, Hosts, strip_port};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override GitHub API key.
    pub github_api_key: Option<String>,
    /// Override refresh token.
    pub refresh_token: Option<String>,
    /// Override refresh interval in minutes.
    pub refresh_interval: Option<u64>,
    /// Override web server root folder.
    pub base_folder: Option<PathBuf>,
    /// Override shared assets folder.
    pub shared_folder: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docsrv.toml";

/// Refresh interval used when none (or a value below one minute) is configured.
const DEFAULT_REFRESH_MINUTES: u64 = 5;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Filesystem locations (relative strings from TOML).
    paths: PathsConfigRaw,
    /// GitHub release API configuration.
    pub github: GitHubConfig,
    /// Release indexing configuration.
    pub index: IndexConfig,
    /// Documentation build configuration.
    pub build: BuildConfig,
    /// Host mappings as written in the file.
    pub hosts: BTreeMap<String, HostConfig>,

    /// Resolved filesystem locations (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Resolved host mapping (set after loading).
    #[serde(skip)]
    pub hosts_resolved: Hosts,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            server: ServerConfig::default(),
            paths: PathsConfigRaw::default(),
            github: GitHubConfig::default(),
            index: IndexConfig::default(),
            build: BuildConfig::default(),
            hosts: BTreeMap::new(),
            paths_resolved: PathsConfig::default(),
            hosts_resolved: Hosts::default(),
            config_path: None,
        };
        config.resolve(Path::new("."));
        config
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Request timeout in seconds. Builds run on the request path, so this
    /// is minutes rather than seconds.
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 9091,
            request_timeout: 300,
        }
    }
}

impl ServerConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Raw paths configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    base_folder: Option<String>,
    shared_folder: Option<String>,
}

/// Resolved filesystem locations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathsConfig {
    /// Root folder of the static web server. Built sites go to
    /// `{base_folder}/{host}/{version}`.
    pub base_folder: PathBuf,
    /// Folder with assets shared by every build.
    pub shared_folder: PathBuf,
}

/// GitHub release API configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API key; requests are unauthenticated when unset.
    pub api_key: Option<String>,
    /// API base URL.
    pub api_url: String,
    /// Releases requested per page.
    pub per_page: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.github.com".to_owned(),
            per_page: 100,
        }
    }
}

/// Release indexing configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Minutes between periodic refreshes of indexed projects.
    pub refresh_interval: u64,
    /// Secret that forces a synchronous re-index when passed as `?token=`.
    pub refresh_token: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_MINUTES,
            refresh_token: None,
        }
    }
}

impl IndexConfig {
    /// Refresh interval, falling back to five minutes for values below one.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        let minutes = if self.refresh_interval < 1 {
            DEFAULT_REFRESH_MINUTES
        } else {
            self.refresh_interval
        };
        Duration::from_secs(minutes.saturating_mul(60))
    }
}

/// Documentation build configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Program and arguments run inside the extracted source tree.
    pub command: Vec<String>,
    /// Timeout in seconds for downloading a source archive.
    pub download_timeout: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["make".to_owned(), "docs".to_owned()],
            download_timeout: 600,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`github.api_key`").
        field: String,
        /// Error message (e.g., "${`GITHUB_API_KEY`} not set").
        message: String,
    },
    /// Host mapping whose repository is not `owner/project`.
    #[error("invalid repository {0:?}, expected \"owner/project\"")]
    InvalidRepository(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file; a missing file
    /// yields the defaults. Otherwise, searches for `docsrv.toml` in the
    /// current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if reading, parsing, expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            match Self::load_from_file(path) {
                Err(ConfigError::NotFound(missing)) => {
                    tracing::warn!(path = %missing.display(), "Configuration file not found, using defaults");
                    Self::default()
                }
                other => other?,
            }
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.absolutize_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, resolving relative paths
    /// against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;
        config.resolve(base_dir);
        config.absolutize_paths()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(api_key) = settings.github_api_key.as_ref().filter(|k| !k.is_empty()) {
            self.github.api_key = Some(api_key.clone());
        }
        if let Some(token) = settings.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            self.index.refresh_token = Some(token.clone());
        }
        if let Some(interval) = settings.refresh_interval {
            self.index.refresh_interval = interval;
        }
        if let Some(base_folder) = &settings.base_folder {
            self.paths_resolved.base_folder.clone_from(base_folder);
        }
        if let Some(shared_folder) = &settings.shared_folder {
            self.paths_resolved.shared_folder.clone_from(shared_folder);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());

        tracing::debug!(path = %path.display(), hosts = config.hosts_resolved.len(), "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        if self.server.request_timeout == 0 {
            return Err(ConfigError::Validation(
                "server.request_timeout must be greater than 0".to_owned(),
            ));
        }

        require_http_url(&self.github.api_url, "github.api_url")?;
        if self.github.per_page == 0 {
            return Err(ConfigError::Validation(
                "github.per_page must be greater than 0".to_owned(),
            ));
        }

        match self.build.command.first() {
            Some(program) => require_non_empty(program, "build.command")?,
            None => {
                return Err(ConfigError::Validation(
                    "build.command cannot be empty".to_owned(),
                ));
            }
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.github.api_key = expand::expand_optional(self.github.api_key.as_deref(), "github.api_key")?;
        self.index.refresh_token =
            expand::expand_optional(self.index.refresh_token.as_deref(), "index.refresh_token")?;
        Ok(())
    }

    /// Anchor relative folders at the current directory.
    ///
    /// Build commands run with the extracted source tree as their working
    /// directory and must receive absolute destinations.
    fn absolutize_paths(&mut self) -> Result<(), ConfigError> {
        self.paths_resolved.base_folder = std::path::absolute(&self.paths_resolved.base_folder)?;
        self.paths_resolved.shared_folder =
            std::path::absolute(&self.paths_resolved.shared_folder)?;
        Ok(())
    }

    /// Resolve relative paths against the config directory and build the
    /// host mapping.
    fn resolve(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths_resolved = PathsConfig {
            base_folder: resolve(self.paths.base_folder.as_deref(), "/var/www/public"),
            shared_folder: resolve(self.paths.shared_folder.as_deref(), "/etc/shared"),
        };
        self.hosts_resolved = Hosts::from_config(&self.hosts);
    }
}
