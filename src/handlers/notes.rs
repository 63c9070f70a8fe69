use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{Json, Response},
};
use uuid::Uuid;

use super::common::{created_response, json_body, no_content_response};
use crate::{
    auth::Session, dto::NoteInput, entities::note, errors::ServiceError, ApiResponse, ApiResult,
    AppState,
};

/// POST /api/v1/projects/:id/notes
pub async fn create_note(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<Uuid>,
    body: Result<Json<NoteInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let payload = json_body(&session, body)?;
    let note = state
        .services
        .notes
        .create_note(&session, project_id, payload)
        .await?;
    Ok(created_response(note))
}

/// PUT /api/v1/notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    session: Session,
    Path(note_id): Path<Uuid>,
    body: Result<Json<NoteInput>, JsonRejection>,
) -> ApiResult<note::Model> {
    let payload = json_body(&session, body)?;
    let note = state
        .services
        .notes
        .update_note(&session, note_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(note)))
}

/// DELETE /api/v1/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    session: Session,
    Path(note_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.notes.delete_note(&session, note_id).await?;
    Ok(no_content_response())
}
