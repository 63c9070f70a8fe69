use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::AuthService;
use crate::errors::ServiceError;

/// The authenticated user on whose behalf an action runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Caller {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
        }
    }
}

/// Explicit request context handed to every action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    caller: Option<Caller>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { caller: None }
    }

    pub fn authenticated(caller: Caller) -> Self {
        Self {
            caller: Some(caller),
        }
    }

    /// The caller, or `Unauthorized` for an anonymous session.
    pub fn caller(&self) -> Result<&Caller, ServiceError> {
        self.caller
            .as_ref()
            .ok_or_else(|| ServiceError::Unauthorized("Unauthorized".to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Builds the session from `Authorization: Bearer <jwt>`.
///
/// Never rejects: a missing or invalid token yields an anonymous session and
/// the action decides whether that is acceptable.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Session::anonymous());
        };

        let auth = Arc::<AuthService>::from_ref(state);
        match auth.caller_from_token(token) {
            Ok(caller) => Ok(Session::authenticated(caller)),
            Err(e) => {
                debug!("Ignoring bearer token: {}", e);
                Ok(Session::anonymous())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn anonymous_session_is_unauthorized() {
        assert_matches!(
            Session::anonymous().caller(),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn authenticated_session_exposes_caller() {
        let id = Uuid::new_v4();
        let session = Session::authenticated(Caller::new(id));
        assert_eq!(session.caller().unwrap().user_id, id);
    }
}
