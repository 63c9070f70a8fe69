use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{auth::Session, errors::ServiceError, notifications::UNKNOWN_IP, ApiResponse};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Unwraps a JSON body for an action that requires a caller.
///
/// The session is checked before the body, so an anonymous request with a
/// malformed payload is still `Unauthorized`.
pub fn json_body<T>(
    session: &Session,
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ServiceError> {
    session.caller()?;
    parse_json(body)
}

/// Maps an axum JSON rejection into the `ValidationError` envelope.
pub fn parse_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(payload)| payload)
        .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))
}

/// Client address as reported by the proxy in front of the API.
pub fn client_ip(headers: &HeaderMap) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}
