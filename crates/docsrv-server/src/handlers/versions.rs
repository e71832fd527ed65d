//! Version list endpoint.

use axum::Json;
use axum::response::{IntoResponse, Response};
use docsrv_index::{ProjectKey, Release};
use serde::Serialize;

use crate::error::RouteError;
use crate::request::RequestTarget;
use crate::state::AppState;

/// Entry of `GET /versions.json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct VersionEntry {
    /// Release tag.
    text: String,
    /// Absolute URL of the version's site, without trailing slash.
    url: String,
}

impl VersionEntry {
    fn new(target: &RequestTarget, release: &Release) -> Self {
        Self {
            text: release.tag().to_owned(),
            url: target.url(&format!("/{}", release.tag())),
        }
    }
}

/// Handle `GET /versions.json`.
pub(crate) async fn list_versions(
    state: &AppState,
    target: &RequestTarget,
    key: &ProjectKey,
) -> Result<Response, RouteError> {
    state.indexer.prepare(key, target.token.as_deref()).await?;

    let versions: Vec<VersionEntry> = state
        .store
        .for_project(key)
        .iter()
        .map(|release| VersionEntry::new(target, release))
        .collect();

    Ok(Json(versions).into_response())
}
