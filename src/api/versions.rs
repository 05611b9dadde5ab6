//! Template version history endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{current_revision, error, success, ApiResult};
use crate::models::{RestoreVersionRequest, TemplateVersion};
use crate::AppState;

/// GET /api/templates/{id}/versions - Full history, newest first.
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TemplateVersion>> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.get_versions(&id).await {
        Ok(versions) => success(versions, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/templates/{id}/versions/current
pub async fn get_current_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TemplateVersion> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.get_current_version(&id).await {
        Ok(version) => success(version, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/templates/{id}/versions/{n}
pub async fn get_version(
    State(state): State<AppState>,
    Path((id, version_number)): Path<(String, i64)>,
) -> ApiResult<TemplateVersion> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.get_version(&id, version_number).await {
        Ok(version) => success(version, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/versions/{n}/restore - Re-append version n as the newest.
pub async fn restore_version(
    State(state): State<AppState>,
    Path((id, version_number)): Path<(String, i64)>,
    Json(request): Json<RestoreVersionRequest>,
) -> ApiResult<TemplateVersion> {
    let revision_id = current_revision(&state.repo).await;

    match state
        .templates
        .restore_version(&id, version_number, &request.created_by)
        .await
    {
        Ok(version) => success(version, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}
