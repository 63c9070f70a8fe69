//! Klyroframe API Library
//!
//! Project-tracking dashboard backend: deadline arithmetic, owner-scoped
//! project/task/note actions and the HTTP surface that exposes them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod services;
pub mod timeline;
pub mod tracing;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::timeline::Timeline;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub timeline: Timeline,
    pub services: handlers::AppServices,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.services.auth.clone()
    }
}

// Common response wrappers
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Dashboard routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::health::health_check))
        .route(
            "/projects",
            get(handlers::projects::list_active_projects).post(handlers::projects::create_project),
        )
        .route(
            "/projects/finished",
            get(handlers::projects::list_finished_projects),
        )
        .route(
            "/projects/:id",
            get(handlers::projects::get_project).put(handlers::projects::update_project),
        )
        .route("/projects/:id/finish", post(handlers::projects::finish_project))
        .route("/projects/:id/notes", post(handlers::notes::create_note))
        .route(
            "/notes/:id",
            put(handlers::notes::update_note).delete(handlers::notes::delete_note),
        )
        .route("/projects/:id/tasks", post(handlers::tasks::create_task))
        .route(
            "/projects/:id/tasks/:task_id",
            delete(handlers::tasks::delete_task),
        )
        .route(
            "/projects/:id/tasks/:task_id/toggle",
            post(handlers::tasks::toggle_task_status),
        )
        .route(
            "/projects/:id/tasks/:task_id/comments",
            post(handlers::tasks::add_task_comment),
        )
}

/// Login endpoint mounted under `/auth`.
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(handlers::auth::login))
}

/// Full application router without the outer layers.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", auth_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
