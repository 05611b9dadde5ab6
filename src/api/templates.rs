//! Template API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{current_revision, error, success, ApiResult};
use crate::models::{
    CreateTemplateRequest, DuplicateTemplateRequest, ForkTemplateRequest,
    PromoteTemplateRequest, Template, TemplateFilters, TemplateVersion, TemplateWithVersion,
    UpdateContentRequest, UpdateTemplateRequest,
};
use crate::AppState;

/// GET /api/templates - List templates matching the query filters.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(filters): Query<TemplateFilters>,
) -> ApiResult<Vec<Template>> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.get_all(&filters).await {
        Ok(templates) => success(templates, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/templates/{id} - Get a single template.
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.get_by_id(&id).await {
        Ok(template) => success(template, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/templates/{id}/full - Get a template with its current content.
pub async fn get_template_full(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TemplateWithVersion> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.get_with_version(&id).await {
        Ok(full) => success(full, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates - Create a template with its first version.
pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.create(request).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/templates/{id} - Update template metadata.
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTemplateRequest>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.update(&id, &request).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/templates/{id}/content - Save new content as the next version.
pub async fn update_template_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateContentRequest>,
) -> ApiResult<TemplateVersion> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.update_content(&id, &request).await {
        Ok(version) => success(version, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/templates/{id} - Delete a template and its history.
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.delete(&id).await {
        Ok(()) => success((), current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/archive
pub async fn archive_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.archive(&id).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/unarchive
pub async fn unarchive_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.unarchive(&id).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/publish
pub async fn publish_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.publish(&id).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/unpublish
pub async fn unpublish_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.unpublish(&id).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/fork - Start a new template lineage from this one.
pub async fn fork_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ForkTemplateRequest>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.fork(&id, &request).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/duplicate - Copy a template under a new name.
pub async fn duplicate_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DuplicateTemplateRequest>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.duplicate(&id, &request).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/templates/{id}/promote - Widen a template's scope.
pub async fn promote_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PromoteTemplateRequest>,
) -> ApiResult<Template> {
    let revision_id = current_revision(&state.repo).await;

    match state.templates.promote(&id, &request).await {
        Ok(template) => success(template, current_revision(&state.repo).await),
        Err(e) => error(e, revision_id),
    }
}
