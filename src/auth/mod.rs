/*!
 * # Authentication
 *
 * Credential login for dashboard users and the bearer tokens that identify
 * them afterwards:
 *
 * - HS256 JWTs carrying the user id as `sub`
 * - argon2 password verification against the stored PHC hash
 * - an optional reCAPTCHA check performed before credentials are examined
 *
 * Handlers turn the bearer token into an explicit [`Session`]; actions never
 * look the caller up on their own.
 */

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub mod captcha;
pub mod password;
mod session;

pub use captcha::{BotCheck, RecaptchaVerifier, SkipBotCheck};
pub use password::{hash_password, verify_password};
pub use session::{Caller, Session};

use crate::entities::user;
use crate::errors::ServiceError;

pub const INVALID_CREDENTIALS: &str = "Credenciales inválidas";
pub const BOT_CHECK_FAILED: &str = "Por favor, confirma que no eres un robot";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            token_expiration,
        }
    }

    pub fn from_app_config(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    /// reCAPTCHA response token from the login form
    #[serde(default, rename = "captchaToken")]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// A successful login: the issued token plus who it belongs to.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: TokenResponse,
    pub user: user::Model,
}

/// Authentication service that handles login and token validation
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    bot_check: Arc<dyn BotCheck>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.config.jwt_issuer)
            .field("audience", &self.config.jwt_audience)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>, bot_check: Arc<dyn BotCheck>) -> Self {
        Self {
            config,
            db,
            bot_check,
        }
    }

    /// Issue a bearer token for `user`.
    pub fn issue_token(&self, user: &user::Model) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| ServiceError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: Some(user.email.clone()),
            name: Some(user.name.clone()),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("Token creation failed: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid token".to_string()),
        })
    }

    pub fn caller_from_token(&self, token: &str) -> Result<Caller, ServiceError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;
        Ok(Caller {
            user_id,
            email: claims.email,
            name: claims.name,
        })
    }

    /// Bot check, then credential check, then token issuance.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, ServiceError> {
        if !self
            .bot_check
            .verify(credentials.captcha_token.as_deref())
            .await
        {
            warn!("Login rejected by bot check");
            return Err(ServiceError::Unauthorized(BOT_CHECK_FAILED.to_string()));
        }

        let email = credentials.email.trim().to_lowercase();
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?;

        let user = match found {
            Some(user) if verify_password(&credentials.password, &user.password_hash) => user,
            _ => {
                warn!("Login rejected: invalid credentials");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome { token, user })
    }
}
