//! Template application endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{current_revision, error, success, ApiResult};
use crate::models::{ApplyResult, ApplyTemplateInput};
use crate::AppState;

/// POST /api/templates/{id}/apply - Instantiate the template's current content.
pub async fn apply_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ApplyTemplateInput>,
) -> ApiResult<ApplyResult> {
    let outcome = state.engine.apply_template(&id, &input).await;
    // Rolled-back applies still moved the revision
    let revision_id = current_revision(&state.repo).await;

    match outcome {
        Ok(result) => success(result, revision_id),
        Err(e) => {
            tracing::warn!("Apply of template {} failed: {}", id, e);
            error(e, revision_id)
        }
    }
}
