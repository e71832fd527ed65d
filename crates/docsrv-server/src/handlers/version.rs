//! On-demand version builds.

use std::path::PathBuf;
use std::sync::Arc;

use axum::response::{IntoResponse, Redirect, Response};
use docsrv_build::BuildJob;
use docsrv_index::{ProjectKey, Release, parse_version};

use crate::error::RouteError;
use crate::request::RequestTarget;
use crate::state::AppState;

/// Handle `GET /{version}/{rest}`.
///
/// Builds the version if it is not installed yet, then redirects to the
/// same URL so the static server answers the follow-up request.
pub(crate) async fn prepare_version(
    state: &AppState,
    target: &RequestTarget,
    key: &ProjectKey,
) -> Result<Response, RouteError> {
    let version = target.version_segment().to_owned();
    state.indexer.prepare(key, target.token.as_deref()).await?;

    if state.installed.is_installed(key, &version) {
        // The static server missed a file under a built version. A path
        // ending in something other than a version names an asset.
        if parse_version(target.last_segment()).is_none() {
            return Err(RouteError::MissingAsset);
        }
        return Err(RouteError::AlreadyInstalled(version));
    }

    let release = state
        .store
        .get(key, &version)
        .ok_or_else(|| RouteError::UnknownRelease(version.clone()))?;

    state.latest.try_set(key, release.tag());

    let destination = destination(state, target, &version);
    tokio::fs::create_dir_all(&destination)
        .await
        .map_err(RouteError::Destination)?;

    let job = build_job(state, target, key, &release, destination);
    let builder = Arc::clone(&state.builder);
    tracing::info!(owner = %key.owner, project = %key.project, version = %version, "Building documentation site");

    let report = tokio::task::spawn_blocking(move || builder.build(&job))
        .await
        .map_err(RouteError::BuildTask)??;

    tracing::debug!(
        owner = %key.owner,
        project = %key.project,
        version = %version,
        total_ms = report.total.as_millis(),
        build_ms = report.build.as_millis(),
        output = %report.output,
        "Build finished"
    );

    state.installed.mark_installed(key, &version);
    Ok(Redirect::temporary(&target.self_url()).into_response())
}

/// `{base_folder}/{host without port}/{version}`.
fn destination(state: &AppState, target: &RequestTarget, version: &str) -> PathBuf {
    state
        .base_folder
        .join(target.host_name())
        .join(version)
}

fn build_job(
    state: &AppState,
    target: &RequestTarget,
    key: &ProjectKey,
    release: &Release,
    destination: PathBuf,
) -> BuildJob {
    BuildJob {
        source_url: release.source_url().to_owned(),
        base_url: target.url(&format!("/{}/", release.tag())),
        destination,
        shared_folder: state.shared_folder.clone(),
        owner: key.owner.clone(),
        project: key.project.clone(),
        version: release.tag().to_owned(),
        host_name: target.host_name().to_owned(),
    }
}
