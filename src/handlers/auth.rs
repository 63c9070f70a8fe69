use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use super::common::{client_ip, parse_json};
use crate::{
    auth::LoginCredentials,
    notifications::{send_login_alert, LoginAlert},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize)]
pub struct LoggedInUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: LoggedInUser,
}

/// POST /auth/login
///
/// Bot check, then credentials. A successful login triggers the access alert
/// email; its delivery never affects the response.
#[instrument(skip(state, headers, credentials))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    credentials: Result<Json<LoginCredentials>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let credentials = parse_json(credentials)?;
    let outcome = state.services.auth.login(&credentials).await?;

    let alert = LoginAlert {
        email: outcome.user.email.clone(),
        ip: client_ip(&headers),
        at: state.timeline.format_absolute(state.timeline.now())?,
    };
    send_login_alert(
        state.services.notifier.as_ref(),
        state.config.login_alert_recipient(),
        &alert,
    )
    .await;

    Ok(Json(ApiResponse::success(LoginResponse {
        access_token: outcome.token.access_token,
        token_type: outcome.token.token_type,
        expires_in: outcome.token.expires_in,
        user: LoggedInUser {
            id: outcome.user.id,
            email: outcome.user.email,
            name: outcome.user.name,
        },
    })))
}
