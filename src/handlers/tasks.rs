use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{Json, Response},
};
use uuid::Uuid;

use super::common::{created_response, json_body, no_content_response};
use crate::{
    auth::Session,
    dto::{CommentInput, TaskInput},
    entities::task,
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};

/// POST /api/v1/projects/:id/tasks
pub async fn create_task(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<Uuid>,
    body: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let payload = json_body(&session, body)?;
    let task = state
        .services
        .tasks
        .create_task(&session, project_id, payload)
        .await?;
    Ok(created_response(task))
}

/// POST /api/v1/projects/:id/tasks/:task_id/toggle
pub async fn toggle_task_status(
    State(state): State<AppState>,
    session: Session,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<task::Model> {
    let task = state
        .services
        .tasks
        .toggle_task_status(&session, project_id, task_id)
        .await?;
    Ok(Json(ApiResponse::success(task)))
}

/// DELETE /api/v1/projects/:id/tasks/:task_id
pub async fn delete_task(
    State(state): State<AppState>,
    session: Session,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ServiceError> {
    state
        .services
        .tasks
        .delete_task_permanent(&session, project_id, task_id)
        .await?;
    Ok(no_content_response())
}

/// POST /api/v1/projects/:id/tasks/:task_id/comments
pub async fn add_task_comment(
    State(state): State<AppState>,
    session: Session,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<CommentInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let payload = json_body(&session, body)?;
    let comment = state
        .services
        .tasks
        .add_task_comment(&session, project_id, task_id, payload)
        .await?;
    Ok(created_response(comment))
}
