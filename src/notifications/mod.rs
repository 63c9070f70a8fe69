use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub const UNKNOWN_IP: &str = "IP desconocida";
const LOGIN_ALERT_SUBJECT: &str = "⚠️ Alerta de Inicio de Sesión - Klyroframe";

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Email API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// What happened at login time, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAlert {
    pub email: String,
    pub ip: String,
    /// Login time rendered in the business zone
    pub at: String,
}

impl LoginAlert {
    pub fn subject(&self) -> &'static str {
        LOGIN_ALERT_SUBJECT
    }

    pub fn html(&self) -> String {
        format!(
            concat!(
                "<div style=\"font-family: sans-serif; padding: 20px; color: #111;\">",
                "<h2>Alerta de Acceso</h2>",
                "<p>Se ha iniciado una nueva sesión en el sistema:</p>",
                "<p><strong>Usuario:</strong> {}</p>",
                "<p><strong>Dirección IP:</strong> {}</p>",
                "<p><strong>Fecha:</strong> {}</p>",
                "<p style=\"font-size: 12px; color: #666;\">Este es un mensaje automático generado por Klyroframe.</p>",
                "</div>"
            ),
            escape_html(&self.email),
            escape_html(&self.ip),
            escape_html(&self.at),
        )
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Delivers a login alert to a recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, alert: &LoginAlert) -> Result<(), NotificationError>;
}

/// Used when no email API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _recipient: &str, alert: &LoginAlert) -> Result<(), NotificationError> {
        warn!(email = %alert.email, "Email API key is not configured; skipping login alert");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Sends email through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            api_url: api_url.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    #[instrument(skip(self, alert), fields(email = %alert.email))]
    async fn notify(&self, recipient: &str, alert: &LoginAlert) -> Result<(), NotificationError> {
        let payload = ResendEmail {
            from: &self.from,
            to: [recipient],
            subject: alert.subject(),
            html: alert.html(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Login alert delivered");
        Ok(())
    }
}

/// Sends the alert if a recipient is configured. Failures are logged only.
pub async fn send_login_alert(notifier: &dyn Notifier, recipient: Option<&str>, alert: &LoginAlert) {
    let Some(recipient) = recipient else {
        warn!("No login alert recipient configured; skipping notification");
        return;
    };

    if let Err(e) = notifier.notify(recipient, alert).await {
        warn!(error = %e, "Failed to send login alert");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_html_escapes_user_supplied_values() {
        let alert = LoginAlert {
            email: "<admin>@klyroframe.local".into(),
            ip: UNKNOWN_IP.into(),
            at: "15/01/2024 10:30".into(),
        };
        let html = alert.html();
        assert!(html.contains("&lt;admin&gt;@klyroframe.local"));
        assert!(html.contains(UNKNOWN_IP));
        assert!(html.contains("15/01/2024 10:30"));
    }
}
