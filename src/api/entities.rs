//! Read endpoints for rooms, projects and quotes created by applies.

use axum::extract::{Path, State};

use super::{current_revision, error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Project, Quote, Room};
use crate::services::{ProjectService, QuoteService, RoomService};
use crate::AppState;

/// GET /api/rooms/{id}
pub async fn get_room(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Room> {
    let revision_id = current_revision(&state.repo).await;

    match RoomService::get_by_id(&*state.repo, &id).await {
        Ok(Some(room)) => success(room, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Room {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let revision_id = current_revision(&state.repo).await;

    match ProjectService::get_by_id(&*state.repo, &id).await {
        Ok(Some(project)) => success(project, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Project {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/projects/{id}/rooms
pub async fn list_project_rooms(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Room>> {
    let revision_id = current_revision(&state.repo).await;

    match state.repo.list_by_project(&id).await {
        Ok(rooms) => success(rooms, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/quotes/{id}
pub async fn get_quote(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Quote> {
    let revision_id = current_revision(&state.repo).await;

    match QuoteService::get_by_id(&*state.repo, &id).await {
        Ok(Some(quote)) => success(quote, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Quote {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}
