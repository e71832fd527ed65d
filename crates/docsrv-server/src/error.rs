//! Routing errors and their public responses.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use docsrv_build::BuildError;

use crate::indexer::IndexError;
use crate::request::RequestTarget;

/// Why a request could not be served.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RouteError {
    /// Host is not mapped to a project.
    #[error("host {0} is not mapped to a project")]
    UnmappedHost(String),

    /// Project has no usable releases.
    #[error("no releases found for project")]
    NoReleases,

    /// Requested version is not a known release.
    #[error("release {0} not found")]
    UnknownRelease(String),

    /// Version is built but the requested asset is not part of it.
    #[error("asset not found under installed version")]
    MissingAsset,

    /// Version is built but the static server did not serve it.
    #[error("version {0} is installed but was requested from docsrv")]
    AlreadyInstalled(String),

    /// Release list could not be fetched.
    #[error("error indexing project")]
    Index(#[from] IndexError),

    /// Destination directory could not be created.
    #[error("could not create destination directory")]
    Destination(#[source] io::Error),

    /// Build failed.
    #[error("could not build docs")]
    Build(#[from] BuildError),

    /// Build task panicked.
    #[error("build task failed")]
    BuildTask(#[source] tokio::task::JoinError),
}

impl RouteError {
    /// Public response for this error.
    ///
    /// Not-found and internal errors redirect to `/404/` and `/500/` so the
    /// static server can render its error pages. A missing asset under an
    /// installed version is a bare 404.
    pub(crate) fn into_response_for(self, target: &RequestTarget) -> Response {
        match self {
            Self::MissingAsset => StatusCode::NOT_FOUND.into_response(),
            Self::UnmappedHost(_)
            | Self::NoReleases
            | Self::UnknownRelease(_)
            | Self::AlreadyInstalled(_) => {
                tracing::debug!(host = %target.host, path = %target.path, reason = %self, "Not found");
                not_found(target)
            }
            Self::Index(_) | Self::Destination(_) | Self::Build(_) | Self::BuildTask(_) => {
                tracing::error!(
                    host = %target.host,
                    path = %target.path,
                    error = %self,
                    cause = %error_chain(&self),
                    "Request failed"
                );
                internal_error(target)
            }
        }
    }
}

/// Temporary redirect to the not-found page.
pub(crate) fn not_found(target: &RequestTarget) -> Response {
    Redirect::temporary(&target.url("/404/")).into_response()
}

/// Temporary redirect to the internal-error page.
pub(crate) fn internal_error(target: &RequestTarget) -> Response {
    Redirect::temporary(&target.url("/500/")).into_response()
}

/// Sources of `err` joined with `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}
