pub mod auth;
pub mod common;
pub mod health;
pub mod notes;
pub mod projects;
pub mod tasks;

use std::sync::Arc;
use tracing::info;

use crate::{
    auth::{AuthConfig, AuthService, BotCheck, RecaptchaVerifier, SkipBotCheck},
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    notifications::{DisabledNotifier, Notifier, ResendNotifier},
    services::{
        dashboard::DashboardService, notes::NoteService, projects::ProjectService,
        tasks::TaskService,
    },
    timeline::Timeline,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub projects: Arc<ProjectService>,
    pub notes: Arc<NoteService>,
    pub tasks: Arc<TaskService>,
    pub dashboard: Arc<DashboardService>,
    pub auth: Arc<AuthService>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        timeline: Timeline,
        auth: Arc<AuthService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            projects: Arc::new(ProjectService::new(
                db_pool.clone(),
                event_sender.clone(),
                timeline.clone(),
            )),
            notes: Arc::new(NoteService::new(
                db_pool.clone(),
                event_sender.clone(),
                timeline.clone(),
            )),
            tasks: Arc::new(TaskService::new(
                db_pool.clone(),
                event_sender,
                timeline.clone(),
            )),
            dashboard: Arc::new(DashboardService::new(db_pool, timeline)),
            auth,
            notifier,
        }
    }

    /// Wires the external collaborators (bot check, email) as configured.
    pub fn from_app_config(
        cfg: &AppConfig,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        timeline: Timeline,
    ) -> Self {
        let bot_check: Arc<dyn BotCheck> = match cfg.recaptcha_secret() {
            Some(secret) => Arc::new(RecaptchaVerifier::new(secret, &cfg.recaptcha_verify_url)),
            None => {
                info!("reCAPTCHA secret not configured; login bot check disabled");
                Arc::new(SkipBotCheck)
            }
        };

        let notifier: Arc<dyn Notifier> = match cfg.resend_key() {
            Some(key) => Arc::new(ResendNotifier::new(
                key,
                &cfg.resend_api_url,
                &cfg.notification_from,
            )),
            None => Arc::new(DisabledNotifier),
        };

        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(cfg),
            db_pool.clone(),
            bot_check,
        ));

        Self::new(db_pool, event_sender, timeline, auth, notifier)
    }
}
