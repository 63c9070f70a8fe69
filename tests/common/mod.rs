#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;

use klyroframe::{
    auth::{AuthConfig, AuthService, BotCheck, Caller, Session, SkipBotCheck},
    config::AppConfig,
    db,
    dto::ProjectInput,
    entities::user,
    events::{Event, EventSender},
    handlers::AppServices,
    notifications::{DisabledNotifier, LoginAlert, NotificationError, Notifier},
    services::accounts::AccountService,
    timeline::{ManualClock, Timeline, DEFAULT_CIVIL_ZONE},
    AppState,
};

pub const TEST_SECRET: &str =
    "klyroframe-test-secret-0123456789-abcdefghijklmnopqrstuvwxyz-ABCDEFGHIJ";
pub const TEST_PASSWORD: &str = "changeme123";

/// 2024-01-15 09:00 in Santiago (UTC-3 during the southern summer).
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// A valid project spanning 2024-01-10 09:00 to 2024-01-20 09:00 local time.
pub fn project_input(name: &str, client: &str) -> ProjectInput {
    ProjectInput {
        project_name: name.to_string(),
        client_name: client.to_string(),
        client_whatsapp: "+56 9 1234 5678".to_string(),
        project_type: Some("fastpage".to_string()),
        custom_description: None,
        start_date: "2024-01-10T09:00".to_string(),
        deadline: "2024-01-20T09:00".to_string(),
    }
}

/// Notifier that keeps every alert in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<(String, LoginAlert)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, LoginAlert)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, alert: &LoginAlert) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), alert.clone()));
        Ok(())
    }
}

/// Bot check answering a fixed verdict.
pub struct FixedBotCheck(pub bool);

#[async_trait]
impl BotCheck for FixedBotCheck {
    async fn verify(&self, _token: Option<&str>) -> bool {
        self.0
    }
}

/// Application state over a fresh in-memory SQLite database and a manual clock.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub clock: ManualClock,
    events: Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_collaborators(Arc::new(SkipBotCheck), Arc::new(DisabledNotifier), None).await
    }

    pub async fn with_collaborators(
        bot_check: Arc<dyn BotCheck>,
        notifier: Arc<dyn Notifier>,
        alert_recipient: Option<&str>,
    ) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A second connection would see a different in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.notification_recipient = alert_recipient.map(str::to_string);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let clock = ManualClock::new(test_start());
        let timeline = Timeline::new(DEFAULT_CIVIL_ZONE, Arc::new(clock.clone()))
            .expect("default zone resolves");

        let (event_sender, event_rx) = EventSender::channel(256);

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
            bot_check,
        ));
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender),
            timeline.clone(),
            auth_service,
            notifier,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            timeline,
            services,
        };

        Self {
            router: klyroframe::app_router(state.clone()),
            state,
            clock,
            events: Mutex::new(event_rx),
        }
    }

    pub async fn create_user(&self, email: &str) -> user::Model {
        AccountService::new(self.state.db.clone())
            .upsert_user(email, "Tester", TEST_PASSWORD)
            .await
            .expect("seed user")
    }

    pub fn session_for(&self, user: &user::Model) -> Session {
        Session::authenticated(Caller {
            user_id: user.id,
            email: Some(user.email.clone()),
            name: Some(user.name.clone()),
        })
    }

    pub fn token_for(&self, user: &user::Model) -> String {
        self.state
            .services
            .auth
            .issue_token(user)
            .expect("issue token")
            .access_token
    }

    /// Every event published since the previous call.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Collects a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is json")
}
