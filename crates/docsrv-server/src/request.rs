//! Request identity used for routing and redirects.

use axum::extract::{Query, Request};
use axum::http::{HeaderMap, Uri, header};
use docsrv_config::strip_port;
use serde::Deserialize;

#[derive(Deserialize)]
struct TokenParams {
    token: Option<String>,
}

/// Scheme, host, path and refresh token of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTarget {
    /// `http` or `https`.
    pub(crate) scheme: String,
    /// Host as sent by the client, including any port.
    pub(crate) host: String,
    /// Request path, always starting with `/`.
    pub(crate) path: String,
    /// Raw query string.
    pub(crate) query: Option<String>,
    /// Value of the `token` query parameter.
    pub(crate) token: Option<String>,
}

impl RequestTarget {
    pub(crate) fn from_request(request: &Request) -> Self {
        Self::from_parts(request.uri(), request.headers())
    }

    /// Scheme comes from the URI, then `X-Forwarded-Proto`, then `http`.
    /// Host comes from the `Host` header, then the URI authority.
    pub(crate) fn from_parts(uri: &Uri, headers: &HeaderMap) -> Self {
        let scheme = uri
            .scheme_str()
            .map(str::to_owned)
            .or_else(|| header_str(headers, "x-forwarded-proto"))
            .unwrap_or_else(|| "http".to_owned());

        let host = header_str(headers, header::HOST.as_str())
            .or_else(|| uri.authority().map(|a| a.as_str().to_owned()))
            .unwrap_or_default();

        let token = Query::<TokenParams>::try_from_uri(uri)
            .ok()
            .and_then(|Query(params)| params.token);

        Self {
            scheme,
            host,
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            token,
        }
    }

    /// Host without its `:port` suffix.
    pub(crate) fn host_name(&self) -> &str {
        strip_port(&self.host)
    }

    /// Absolute URL of `path` on the requested host.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }

    /// Absolute URL of the request itself, query included except for the
    /// refresh token.
    pub(crate) fn self_url(&self) -> String {
        let query = self.query.as_deref().map_or_else(String::new, |query| {
            query
                .split('&')
                .filter(|pair| pair.split('=').next() != Some("token"))
                .collect::<Vec<_>>()
                .join("&")
        });
        if query.is_empty() {
            self.url(&self.path)
        } else {
            self.url(&format!("{}?{query}", self.path))
        }
    }

    /// First path segment, the version for `/{version}/...` requests.
    pub(crate) fn version_segment(&self) -> &str {
        self.path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }

    /// Last non-empty path segment.
    pub(crate) fn last_segment(&self) -> &str {
        self.path
            .trim_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    use super::*;

    fn target(uri: &str, headers: &[(&'static str, &'static str)]) -> RequestTarget {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(value));
        }
        RequestTarget::from_parts(&uri.parse().unwrap(), &map)
    }

    #[test]
    fn test_scheme_resolution() {
        assert_eq!(target("/", &[("host", "a.example.com")]).scheme, "http");
        assert_eq!(
            target("/", &[("host", "a.example.com"), ("x-forwarded-proto", "https")]).scheme,
            "https"
        );
        assert_eq!(
            target("https://a.example.com/", &[("x-forwarded-proto", "http")]).scheme,
            "https"
        );
    }

    #[test]
    fn test_host_resolution() {
        let t = target("/v1.0.0/", &[("host", "docs.example.com:9090")]);
        assert_eq!(t.host, "docs.example.com:9090");
        assert_eq!(t.host_name(), "docs.example.com");

        let t = target("http://other.example.com/", &[]);
        assert_eq!(t.host, "other.example.com");
    }

    #[test]
    fn test_token_and_self_url() {
        let t = target(
            "/v1.0.0/guide.html?token=abc&x=1",
            &[("host", "docs.example.com")],
        );
        assert_eq!(t.token.as_deref(), Some("abc"));
        assert_eq!(t.self_url(), "http://docs.example.com/v1.0.0/guide.html?x=1");

        let t = target("/v1.0.0/?token=abc", &[("host", "docs.example.com")]);
        assert_eq!(t.self_url(), "http://docs.example.com/v1.0.0/");

        let t = target("/v1.0.0/?tokens=1", &[("host", "docs.example.com")]);
        assert_eq!(t.self_url(), "http://docs.example.com/v1.0.0/?tokens=1");

        let t = target("/v1.0.0/", &[("host", "docs.example.com")]);
        assert_eq!(t.token, None);
        assert_eq!(t.self_url(), "http://docs.example.com/v1.0.0/");
    }

    #[test]
    fn test_segments() {
        let t = target("/v1.0.0/api/guide.html", &[("host", "d")]);
        assert_eq!(t.version_segment(), "v1.0.0");
        assert_eq!(t.last_segment(), "guide.html");

        let t = target("/v1.0.0/", &[("host", "d")]);
        assert_eq!(t.version_segment(), "v1.0.0");
        assert_eq!(t.last_segment(), "v1.0.0");

        let t = target("/", &[("host", "d")]);
        assert_eq!(t.version_segment(), "");
    }
}
