//! GitHub REST API release listing.

use std::time::Duration;

use docsrv_index::{ProjectKey, Release};
use semver::Version;
use tracing::debug;
use ureq::Agent;

use crate::error::FetchError;
use crate::select::{ReleaseCandidate, select_releases};
use crate::ReleaseFetcher;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

const USER_AGENT: &str = concat!("docsrv/", env!("CARGO_PKG_VERSION"));

/// Lists releases through the GitHub REST API.
///
/// Follows `Link: <...>; rel="next"` headers until every page is read.
pub struct GitHubFetcher {
    agent: Agent,
    api_url: String,
    api_key: Option<String>,
    per_page: u32,
}

impl GitHubFetcher {
    /// Create a fetcher against `api_url` (e.g. `https://api.github.com`).
    ///
    /// Without an API key requests are anonymous and subject to GitHub's
    /// lower rate limits.
    #[must_use]
    pub fn new(api_url: &str, api_key: Option<String>, per_page: u32) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_key: api_key.filter(|k| !k.is_empty()),
            per_page: per_page.max(1),
        }
    }

    fn first_page_url(&self, key: &ProjectKey) -> String {
        format!(
            "{}/repos/{}/{}/releases?per_page={}",
            self.api_url, key.owner, key.project, self.per_page
        )
    }

    /// Fetch one page, returning its releases and the next page URL.
    fn fetch_page(&self, url: &str) -> Result<(Vec<ReleaseCandidate>, Option<String>), FetchError> {
        let mut request = self
            .agent
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }

        let response = request.call()?;
        let status = response.status().as_u16();
        let next = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(FetchError::HttpResponse {
                status,
                body: error_body,
            });
        }

        let page: Vec<ReleaseCandidate> = body.read_json()?;
        Ok((page, next))
    }
}

impl ReleaseFetcher for GitHubFetcher {
    fn releases(
        &self,
        key: &ProjectKey,
        min_version: Option<&Version>,
    ) -> Result<Vec<Release>, FetchError> {
        let mut candidates = Vec::new();
        let mut next = Some(self.first_page_url(key));
        let mut pages = 0usize;

        while let Some(url) = next {
            let (page, following) = self.fetch_page(&url)?;
            pages += 1;
            candidates.extend(page);
            next = following;
        }

        let releases = select_releases(candidates, min_version);
        debug!(project = %key, pages, releases = releases.len(), "Listed releases");
        Ok(releases)
    }
}

/// URL of the `rel="next"` entry of an RFC 8288 `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_owned)
    })
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Serve canned responses on a loopback port, recording request lines
    /// and authorization headers.
    fn serve(
        responses: Vec<(u16, Vec<(String, String)>, String)>,
    ) -> (String, Arc<Mutex<Vec<(String, Option<String>)>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);

        thread::spawn(move || {
            for (status, headers, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut auth = None;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':')
                        && name.eq_ignore_ascii_case("authorization")
                    {
                        auth = Some(value.trim().to_owned());
                    }
                }
                recorder
                    .lock()
                    .unwrap()
                    .push((request_line.trim().to_owned(), auth));

                let mut response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    body.len()
                );
                for (name, value) in headers {
                    response.push_str(&format!("{name}: {value}\r\n"));
                }
                response.push_str("\r\n");
                response.push_str(&body);
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        (base, seen)
    }

    #[test]
    fn test_next_link() {
        let header = r#"<https://api.github.com/repositories/1/releases?page=2>; rel="next", <https://api.github.com/repositories/1/releases?page=5>; rel="last""#;
        assert_eq!(
            next_link(header),
            Some("https://api.github.com/repositories/1/releases?page=2".to_owned())
        );
    }

    #[test]
    fn test_next_link_absent_on_last_page() {
        let header = r#"<https://api.github.com/repositories/1/releases?page=1>; rel="prev", <https://api.github.com/repositories/1/releases?page=1>; rel="first""#;
        assert_eq!(next_link(header), None);
        assert_eq!(next_link(""), None);
    }

    #[test]
    fn test_releases_follows_pagination() {
        let page_two = r#"[{"tag_name": "v0.9.0", "tarball_url": "t/v0.9.0"}, {"tag_name": "v1.1.0", "tarball_url": "t/v1.1.0", "prerelease": true}]"#;
        let page_one = r#"[{"tag_name": "v1.0.0", "tarball_url": "t/v1.0.0"}, {"tag_name": "v0.8.0", "tarball_url": "t/v0.8.0", "draft": true}]"#;

        // Serve page two first so its address can be linked from page one.
        let (second_base, _) = serve(vec![(200, vec![], page_two.to_owned())]);
        let link = format!("<{second_base}/next?page=2>; rel=\"next\"");
        let (first_base, seen) = serve(vec![(
            200,
            vec![("Link".to_owned(), link)],
            page_one.to_owned(),
        )]);

        let fetcher = GitHubFetcher::new(&first_base, Some("secret".to_owned()), 2);
        let releases = fetcher
            .releases(&ProjectKey::new("acme", "widget"), None)
            .unwrap();

        let tags: Vec<&str> = releases.iter().map(Release::tag).collect();
        assert_eq!(tags, vec!["v0.9.0", "v1.0.0"]);
        assert_eq!(releases[1].source_url(), "t/v1.0.0");

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "GET /repos/acme/widget/releases?per_page=2 HTTP/1.1".to_owned(),
                Some("Bearer secret".to_owned())
            )
        );
    }

    #[test]
    fn test_releases_error_status() {
        let (base, seen) = serve(vec![(
            404,
            vec![],
            r#"{"message": "Not Found"}"#.to_owned(),
        )]);

        let fetcher = GitHubFetcher::new(&base, None, 100);
        let err = fetcher
            .releases(&ProjectKey::new("acme", "missing"), None)
            .unwrap_err();

        match err {
            FetchError::HttpResponse { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("Not Found"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(seen.lock().unwrap()[0].1, None);
    }
}
