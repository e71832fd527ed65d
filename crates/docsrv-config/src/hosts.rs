//! Mapping from request hosts to documented projects.

use std::collections::{BTreeMap, HashMap};

use docsrv_index::{ProjectKey, parse_version};
use semver::Version;
use serde::Deserialize;

use crate::ConfigError;

/// A `[hosts."<host>"]` entry as written in the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    /// Repository in the form `owner/project`.
    pub repository: String,
    /// Oldest version for which documentation may be built.
    #[serde(default, rename = "min-version")]
    pub min_version: Option<String>,
}

impl HostConfig {
    /// Parse the repository into a project key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRepository`] unless the repository has
    /// the form `owner/project`.
    pub fn project_key(&self) -> Result<ProjectKey, ConfigError> {
        ProjectKey::parse(&self.repository)
            .ok_or_else(|| ConfigError::InvalidRepository(self.repository.clone()))
    }

    /// Parsed minimum version, `None` if missing or not a version.
    #[must_use]
    pub fn min_version(&self) -> Option<Version> {
        self.min_version.as_deref().and_then(parse_version)
    }
}

#[derive(Debug, Clone)]
struct HostEntry {
    key: ProjectKey,
    min_version: Option<Version>,
}

/// Resolved host mapping.
///
/// Malformed entries are dropped at construction and never match a lookup.
#[derive(Debug, Clone, Default)]
pub struct Hosts {
    entries: HashMap<String, HostEntry>,
}

impl Hosts {
    /// Resolve raw host entries, logging and skipping malformed ones.
    #[must_use]
    pub fn from_config(raw: &BTreeMap<String, HostConfig>) -> Self {
        let mut entries = HashMap::with_capacity(raw.len());
        for (host, conf) in raw {
            let key = match conf.project_key() {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Ignoring host mapping");
                    continue;
                }
            };

            let min_version = conf.min_version();
            if let Some(raw_min) = &conf.min_version
                && min_version.is_none()
            {
                tracing::warn!(host = %host, min_version = %raw_min, "Ignoring invalid min-version");
            }

            entries.insert(host.clone(), HostEntry { key, min_version });
        }
        Self { entries }
    }

    /// Project served at `host`.
    ///
    /// Tries the host verbatim, then without its `:port` suffix.
    #[must_use]
    pub fn project_for_host(&self, host: &str) -> Option<&ProjectKey> {
        self.entries
            .get(host)
            .or_else(|| self.entries.get(strip_port(host)))
            .map(|entry| &entry.key)
    }

    /// Minimum version used when indexing `key`.
    ///
    /// When several hosts serve the same project, the lowest floor wins so
    /// that no host loses versions it was configured to show.
    #[must_use]
    pub fn min_version_for(&self, key: &ProjectKey) -> Option<Version> {
        let mut floors = self
            .entries
            .values()
            .filter(|entry| &entry.key == key)
            .map(|entry| entry.min_version.clone());

        let first = floors.next()?;
        floors.fold(first, |acc, next| match (acc, next) {
            (Some(a), Some(b)) => Some(if b < a { b } else { a }),
            _ => None,
        })
    }

    /// Number of usable host mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no host is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(host, project)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectKey)> {
        self.entries
            .iter()
            .map(|(host, entry)| (host.as_str(), &entry.key))
    }
}

/// Strip a trailing `:port` from a host, keeping bracketed IPv6 literals.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}
