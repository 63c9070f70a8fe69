use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use klyroframe::{
    auth::{BotCheck, RecaptchaVerifier},
    notifications::{send_login_alert, LoginAlert, NotificationError, Notifier, ResendNotifier},
};

fn alert() -> LoginAlert {
    LoginAlert {
        email: "ana@klyroframe.local".into(),
        ip: "203.0.113.7".into(),
        at: "15/01/2024 09:00".into(),
    }
}

#[tokio::test]
async fn recaptcha_accepts_a_verified_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/siteverify"))
        .and(body_string_contains("secret=server-secret"))
        .and(body_string_contains("response=good-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let verifier =
        RecaptchaVerifier::new("server-secret", format!("{}/siteverify", server.uri()));
    assert!(verifier.verify(Some("good-token")).await);
}

#[tokio::test]
async fn recaptcha_rejects_failed_or_missing_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/siteverify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error-codes": ["invalid-input-response"]
        })))
        .mount(&server)
        .await;

    let verifier =
        RecaptchaVerifier::new("server-secret", format!("{}/siteverify", server.uri()));
    assert!(!verifier.verify(Some("forged")).await);
    assert!(!verifier.verify(None).await);
    assert!(!verifier.verify(Some("   ")).await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn recaptcha_treats_garbage_responses_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let verifier = RecaptchaVerifier::new("server-secret", server.uri());
    assert!(!verifier.verify(Some("token")).await);
}

#[tokio::test]
async fn resend_posts_the_alert_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(json!({
            "from": "Klyroframe <alertas@klyroframe.local>",
            "to": ["owner@klyroframe.local"],
            "subject": "⚠️ Alerta de Inicio de Sesión - Klyroframe"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_123" })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = ResendNotifier::new(
        "re_test_key",
        format!("{}/emails", server.uri()),
        "Klyroframe <alertas@klyroframe.local>",
    );
    notifier
        .notify("owner@klyroframe.local", &alert())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let html = body["html"].as_str().unwrap();
    assert!(html.contains("ana@klyroframe.local"));
    assert!(html.contains("203.0.113.7"));
    assert!(html.contains("15/01/2024 09:00"));
}

#[tokio::test]
async fn resend_rejection_is_reported_but_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
        .expect(2)
        .mount(&server)
        .await;

    let notifier = ResendNotifier::new("re_test_key", server.uri(), "nobody");
    let err = notifier
        .notify("owner@klyroframe.local", &alert())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        NotificationError::Rejected { status: 422, ref body } if body == "invalid from"
    );

    send_login_alert(&notifier, Some("owner@klyroframe.local"), &alert()).await;
}

#[tokio::test]
async fn no_recipient_means_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = ResendNotifier::new("re_test_key", server.uri(), "nobody");
    send_login_alert(&notifier, None, &alert()).await;
}
