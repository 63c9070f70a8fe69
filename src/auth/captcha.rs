use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Human-verification check performed before credentials are examined.
#[async_trait]
pub trait BotCheck: Send + Sync {
    /// True when the submitted token proves a human.
    async fn verify(&self, token: Option<&str>) -> bool;
}

/// Used when no verification secret is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipBotCheck;

#[async_trait]
impl BotCheck for SkipBotCheck {
    async fn verify(&self, _token: Option<&str>) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA `siteverify` client.
#[derive(Debug, Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>, verify_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            secret: secret.into(),
            verify_url: verify_url.into(),
        }
    }
}

#[async_trait]
impl BotCheck for RecaptchaVerifier {
    async fn verify(&self, token: Option<&str>) -> bool {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("Login attempt without a reCAPTCHA token");
            return false;
        };

        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await;

        let body = match response {
            Ok(resp) => resp.json::<SiteverifyResponse>().await,
            Err(e) => {
                warn!("reCAPTCHA verification request failed: {}", e);
                return false;
            }
        };

        match body {
            Ok(result) => {
                if !result.success {
                    debug!(error_codes = ?result.error_codes, "reCAPTCHA rejected token");
                }
                result.success
            }
            Err(e) => {
                warn!("Unreadable reCAPTCHA response: {}", e);
                false
            }
        }
    }
}
