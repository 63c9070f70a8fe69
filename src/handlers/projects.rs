use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{Json, Response},
};
use uuid::Uuid;

use super::common::{created_response, json_body};
use crate::{
    auth::Session,
    dto::ProjectInput,
    entities::project,
    errors::ServiceError,
    services::dashboard::{ActiveProjectsQuery, ProjectCard, ProjectDetail},
    ApiResponse, ApiResult, AppState,
};

/// GET /api/v1/projects?q=
pub async fn list_active_projects(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ActiveProjectsQuery>,
) -> ApiResult<Vec<ProjectCard>> {
    let cards = state
        .services
        .dashboard
        .active_projects(&session, &query)
        .await?;
    Ok(Json(ApiResponse::success(cards)))
}

/// GET /api/v1/projects/finished
pub async fn list_finished_projects(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Vec<ProjectCard>> {
    let cards = state.services.dashboard.finished_projects(&session).await?;
    Ok(Json(ApiResponse::success(cards)))
}

/// GET /api/v1/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectDetail> {
    let detail = state.services.dashboard.project_detail(&session, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<ProjectInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let payload = json_body(&session, body)?;
    let project = state
        .services
        .projects
        .create_project(&session, payload)
        .await?;
    Ok(created_response(project))
}

/// PUT /api/v1/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    body: Result<Json<ProjectInput>, JsonRejection>,
) -> ApiResult<project::Model> {
    let payload = json_body(&session, body)?;
    let project = state
        .services
        .projects
        .update_project(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(project)))
}

/// POST /api/v1/projects/:id/finish
pub async fn finish_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<project::Model> {
    let project = state.services.projects.finish_project(&session, id).await?;
    Ok(Json(ApiResponse::success(project)))
}
