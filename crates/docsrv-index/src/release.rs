//! Release and project identity types.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

/// Tag that could not be parsed as a semantic version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a semantic version: {0:?}")]
pub struct InvalidVersion(pub String);

/// Identity of a documented project: the repository owner and its name.
///
/// Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey {
    /// Organization or user owning the repository.
    pub owner: String,
    /// Repository name.
    pub project: String,
}

impl ProjectKey {
    /// Create a key from owner and project names.
    #[must_use]
    pub fn new(owner: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            project: project.into(),
        }
    }

    /// Parse an `owner/project` string.
    ///
    /// Returns `None` unless the input has exactly two non-empty segments.
    #[must_use]
    pub fn parse(repository: &str) -> Option<Self> {
        let (owner, project) = repository.split_once('/')?;
        if owner.is_empty() || project.is_empty() || project.contains('/') {
            return None;
        }
        Some(Self::new(owner, project))
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.project)
    }
}

/// A published, non-draft, non-prerelease release of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    tag: String,
    source_url: String,
    version: Version,
}

impl Release {
    /// Create a release from its tag and source archive URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidVersion`] if the tag is not a semantic version.
    pub fn new(tag: impl Into<String>, source_url: impl Into<String>) -> Result<Self, InvalidVersion> {
        let tag = tag.into();
        let version = parse_version(&tag).ok_or_else(|| InvalidVersion(tag.clone()))?;
        Ok(Self {
            tag,
            source_url: source_url.into(),
            version,
        })
    }

    /// Tag name exactly as published (e.g. `v1.2.3`).
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// URL of the downloadable source archive.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Parsed semantic version of the tag.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Order two releases by semantic version, ignoring build metadata.
    #[must_use]
    pub fn cmp_version(&self, other: &Self) -> Ordering {
        self.version.cmp_precedence(&other.version)
    }
}

/// Parse a release tag as a semantic version.
///
/// Accepts an optional leading `v` and pads missing minor/patch components,
/// so `v1`, `1.2` and `v1.2.3-rc.1` are all versions. Returns `None` for
/// anything else, including file names such as `guide.html`.
#[must_use]
pub fn parse_version(tag: &str) -> Option<Version> {
    let raw = tag
        .strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag);

    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    // Pad "1" and "1.2" (optionally followed by pre-release/build suffixes).
    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);
    let parts = core.split('.').count();
    if core.is_empty() || parts > 2 {
        return None;
    }
    let padded = format!("{core}{}{suffix}", ".0".repeat(3 - parts));
    Version::parse(&padded).ok()
}
