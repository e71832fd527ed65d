//! HTTP request handlers.
//!
//! Every request goes through [`dispatch`], which picks a handler by path:
//!
//! 1. `/versions.json` lists the known versions
//! 2. `/latest/...` redirects to the newest version
//! 3. anything else is `/{version}/...` and builds the version on demand

pub(crate) mod latest;
pub(crate) mod version;
pub(crate) mod versions;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::Response;
use docsrv_index::ProjectKey;

use crate::error::{RouteError, internal_error};
use crate::request::RequestTarget;
use crate::state::AppState;

/// Top-level handler.
///
/// Routing runs in its own task so a panic or an elapsed request timeout
/// turns into the internal-error redirect instead of a dropped connection.
/// A timed out task is detached, not aborted, so a running build still
/// completes and gets recorded.
pub(crate) async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let target = RequestTarget::from_request(&request);
    tracing::debug!(host = %target.host, path = %target.path, "New request received");

    let timeout = state.request_timeout;
    let task = tokio::spawn(route(state, target.clone()));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(response))) => response,
        Ok(Ok(Err(e))) => e.into_response_for(&target),
        Ok(Err(e)) => {
            if e.is_panic() {
                tracing::error!(host = %target.host, path = %target.path, "Recovered from panic while routing");
            } else {
                tracing::error!(host = %target.host, path = %target.path, error = %e, "Routing task cancelled");
            }
            internal_error(&target)
        }
        Err(_) => {
            tracing::error!(
                host = %target.host,
                path = %target.path,
                timeout_secs = timeout.as_secs(),
                "Request timed out"
            );
            internal_error(&target)
        }
    }
}

async fn route(state: Arc<AppState>, target: RequestTarget) -> Result<Response, RouteError> {
    let key = project_for(&state, &target)?;

    if target.path == "/versions.json" {
        versions::list_versions(&state, &target, &key).await
    } else if let Some(rest) = target.path.strip_prefix("/latest/") {
        latest::redirect_to_latest(&state, &target, &key, rest).await
    } else {
        version::prepare_version(&state, &target, &key).await
    }
}

fn project_for(state: &AppState, target: &RequestTarget) -> Result<ProjectKey, RouteError> {
    state
        .hosts
        .project_for_host(&target.host)
        .cloned()
        .ok_or_else(|| RouteError::UnmappedHost(target.host.clone()))
}
