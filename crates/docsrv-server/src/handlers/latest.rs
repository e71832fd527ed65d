//! Redirect to the latest version.

use axum::response::{IntoResponse, Redirect, Response};
use docsrv_index::ProjectKey;

use crate::error::RouteError;
use crate::request::RequestTarget;
use crate::state::AppState;

/// Handle `GET /latest/{rest}`.
///
/// A fresh latest-cache entry answers without touching the index, unless
/// the request carries a valid refresh token.
pub(crate) async fn redirect_to_latest(
    state: &AppState,
    target: &RequestTarget,
    key: &ProjectKey,
    rest: &str,
) -> Result<Response, RouteError> {
    let forced = state.indexer.accepts_token(target.token.as_deref());

    if !forced && let Some(tag) = state.latest.get(key) {
        tracing::debug!(owner = %key.owner, project = %key.project, version = %tag, "Latest version served from cache");
        return Ok(redirect(target, &tag, rest));
    }

    if forced {
        state.indexer.refresh_one(key).await?;
    } else {
        state.indexer.ensure_indexed(key).await?;
    }

    let latest = state
        .store
        .snapshot(key)
        .and_then(|set| set.latest().map(|r| r.tag().to_owned()))
        .ok_or(RouteError::NoReleases)?;

    state.latest.set(key, &latest);
    tracing::debug!(owner = %key.owner, project = %key.project, version = %latest, "Redirecting to latest version");
    Ok(redirect(target, &latest, rest))
}

/// Redirect to `/{version}/{rest}`, adding a trailing slash when `rest` is
/// empty.
fn redirect(target: &RequestTarget, version: &str, rest: &str) -> Response {
    let path = if rest.is_empty() {
        format!("/{version}/")
    } else {
        format!("/{version}/{rest}")
    };
    Redirect::temporary(&target.url(&path)).into_response()
}
