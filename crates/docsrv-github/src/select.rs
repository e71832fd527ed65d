//! Release filtering shared by all fetchers.

use docsrv_index::Release;
use semver::Version;
use serde::Deserialize;

/// A release as listed by the upstream API, before filtering.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseCandidate {
    /// Tag name.
    #[serde(rename = "tag_name", default)]
    pub tag: Option<String>,
    /// Source archive URL.
    #[serde(rename = "tarball_url", default)]
    pub source_url: Option<String>,
    /// Unpublished draft.
    #[serde(default)]
    pub draft: bool,
    /// Marked as pre-release upstream.
    #[serde(default)]
    pub prerelease: bool,
}

impl ReleaseCandidate {
    /// A published release with the given tag and archive URL.
    #[must_use]
    pub fn published(tag: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            source_url: Some(source_url.into()),
            draft: false,
            prerelease: false,
        }
    }
}

/// Keep publishable releases at or above `min_version`, sorted ascending.
///
/// Drafts, pre-releases and tags that do not parse as versions are dropped
/// silently.
pub fn select_releases(
    candidates: impl IntoIterator<Item = ReleaseCandidate>,
    min_version: Option<&Version>,
) -> Vec<Release> {
    let mut releases: Vec<Release> = candidates
        .into_iter()
        .filter(|c| !c.draft && !c.prerelease)
        .filter_map(|c| {
            let tag = c.tag?;
            Release::new(tag, c.source_url.unwrap_or_default()).ok()
        })
        .filter(|r| min_version.is_none_or(|min| r.version().cmp_precedence(min).is_ge()))
        .collect();

    releases.sort_by(Release::cmp_version);
    releases
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tags(releases: &[Release]) -> Vec<&str> {
        releases.iter().map(Release::tag).collect()
    }

    #[test]
    fn test_drops_drafts_prereleases_and_invalid_tags() {
        let candidates = vec![
            ReleaseCandidate::published("v1.0.0", "a"),
            ReleaseCandidate {
                draft: true,
                ..ReleaseCandidate::published("v1.1.0", "b")
            },
            ReleaseCandidate {
                prerelease: true,
                ..ReleaseCandidate::published("v2.0.0-rc.1", "c")
            },
            ReleaseCandidate::published("nightly", "d"),
            ReleaseCandidate {
                tag: None,
                ..ReleaseCandidate::published("", "e")
            },
        ];

        assert_eq!(tags(&select_releases(candidates, None)), vec!["v1.0.0"]);
    }

    #[test]
    fn test_sorts_ascending() {
        let candidates = ["v1.10.0", "v1.2.0", "v0.1.0", "v1.9.0"]
            .map(|t| ReleaseCandidate::published(t, ""));

        assert_eq!(
            tags(&select_releases(candidates, None)),
            vec!["v0.1.0", "v1.2.0", "v1.9.0", "v1.10.0"]
        );
    }

    #[test]
    fn test_min_version_is_inclusive() {
        let candidates =
            ["v0.9.0", "v1.0.0", "v1.1.0"].map(|t| ReleaseCandidate::published(t, ""));
        let min = Version::new(1, 0, 0);

        assert_eq!(
            tags(&select_releases(candidates, Some(&min))),
            vec!["v1.0.0", "v1.1.0"]
        );
    }

    #[test]
    fn test_deserialize_github_payload() {
        let json = r#"[
            {"tag_name": "v1.0.0", "tarball_url": "https://api.github.com/t/v1", "draft": false, "prerelease": false, "name": "First"},
            {"tag_name": "v1.1.0", "tarball_url": null, "draft": true}
        ]"#;
        let candidates: Vec<ReleaseCandidate> = serde_json::from_str(json).unwrap();

        assert_eq!(candidates[0], ReleaseCandidate::published("v1.0.0", "https://api.github.com/t/v1"));
        assert!(candidates[1].draft);
        assert_eq!(candidates[1].source_url, None);
    }
}
