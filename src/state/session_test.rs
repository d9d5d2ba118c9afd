use super::*;
use crate::config::{Config, RuntimeMode};
use crate::net::api::ApiClient;
use crate::notify::test_helpers::RecordingNotifier;
use crate::util::decrypt::test_helpers::encrypt_field;
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "my_32_character_encryption_key_123";

async fn session_against(server: &MockServer) -> (Arc<Session>, Arc<RecordingNotifier>, Arc<ApiClient>) {
    let notifier = RecordingNotifier::arc();
    let config = Config {
        api_base_url: server.uri(),
        encryption_key: SECRET.to_owned(),
        runtime_mode: RuntimeMode::Production,
    };
    let api = Arc::new(ApiClient::new(&config, notifier.clone()).expect("client build"));
    let auth = AuthService::new(api.clone());
    (Arc::new(Session::new(auth, notifier.clone(), SECRET)), notifier, api)
}

fn encrypted_email_json(plaintext: &str) -> serde_json::Value {
    let field = encrypt_field(SECRET, rand::rng().random(), plaintext);
    serde_json::to_value(&field).unwrap()
}

fn user_email(snapshot: &SessionSnapshot) -> Option<String> {
    snapshot
        .user
        .as_ref()
        .and_then(|user| user.email.as_ref())
        .and_then(|email| email.as_plain())
        .map(str::to_owned)
}

// =============================================================================
// Initial state
// =============================================================================

#[tokio::test]
async fn initial_state_is_unknown_and_loading() {
    let server = MockServer::start().await;
    let (session, _, _) = session_against(&server).await;

    assert_eq!(session.phase(), SessionPhase::Unknown);
    let snapshot = session.snapshot();
    assert!(snapshot.loading);
    assert!(!snapshot.authenticated);
    assert!(snapshot.user.is_none());
}

// =============================================================================
// Startup check
// =============================================================================

#[tokio::test]
async fn unauthorized_check_becomes_anonymous_silently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Not authenticated"})))
        .expect(1)
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    session.ensure_checked().await;

    assert_eq!(session.phase(), SessionPhase::Anonymous);
    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert!(!snapshot.authenticated);
    assert!(notifier.errors().is_empty(), "401 must stay silent");
}

#[tokio::test]
async fn check_runs_at_most_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    session.ensure_checked().await;
    session.ensure_checked().await;
}

#[tokio::test]
async fn concurrent_checks_issue_one_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(401).set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.ensure_checked().await })
    };
    let second = {
        let session = session.clone();
        tokio::spawn(async move { session.ensure_checked().await })
    };
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(session.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn successful_check_authenticates_and_decrypts_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u1", "name": "alice", "email": encrypted_email_json("alice@example.com")}
        })))
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    session.ensure_checked().await;

    let snapshot = session.snapshot();
    assert!(snapshot.authenticated);
    assert!(!snapshot.loading);
    assert_eq!(user_email(&snapshot).as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn server_error_check_falls_back_to_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    session.ensure_checked().await;

    assert_eq!(session.phase(), SessionPhase::Anonymous);
    assert!(!session.snapshot().loading);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_success_authenticates_with_decrypted_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u1", "name": "alice", "email": encrypted_email_json("a@b.com")}
        })))
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    let outcome = session.login(&json!({"email": "a@b.com", "password": "x"})).await;

    assert!(outcome.success);
    let snapshot = session.snapshot();
    assert!(snapshot.authenticated);
    assert_eq!(user_email(&snapshot).as_deref(), Some("a@b.com"));
    assert_eq!(notifier.successes(), vec!["Login successful!"]);
}

#[tokio::test]
async fn login_with_plaintext_email_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u1", "name": "bob", "email": "bob@plain.dev"}
        })))
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    session.login(&json!({})).await;

    assert_eq!(user_email(&session.snapshot()).as_deref(), Some("bob@plain.dev"));
}

#[tokio::test]
async fn login_failure_notifies_and_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    let outcome = session.login(&json!({})).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Invalid credentials"));
    assert_eq!(session.phase(), SessionPhase::Unknown);
    // Surfaced by both the request chokepoint and the auth flow.
    assert_eq!(notifier.errors(), vec!["Invalid credentials", "Invalid credentials"]);
}

#[tokio::test]
async fn login_unauthorized_notifies_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    let outcome = session.login(&json!({})).await;

    assert!(!outcome.success);
    assert_eq!(notifier.errors(), vec!["Invalid credentials"]);
}

#[tokio::test]
async fn login_success_resets_startup_guard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u1", "name": "alice", "email": "a@b.com"}
        })))
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    session.ensure_checked().await;
    session.login(&json!({})).await;
    // The guard was reset, so the next mount re-validates with the server.
    session.ensure_checked().await;
}

#[tokio::test]
async fn superseded_login_never_overwrites_newer_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "first@b.com"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"id": "u1", "name": "first", "email": "first@b.com"}}))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "second@b.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u2", "name": "second", "email": "second@b.com"}
        })))
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.login(&json!({"email": "first@b.com"})).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = session.login(&json!({"email": "second@b.com"})).await;
    let first = first.await.unwrap();

    assert!(second.success);
    assert!(!first.success);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.user.as_ref().map(|u| u.name.clone()).as_deref(), Some("second"));
    // The superseded call surfaced nothing.
    assert!(notifier.errors().is_empty());
    assert_eq!(notifier.successes(), vec!["Login successful!"]);
}

// =============================================================================
// Register
// =============================================================================

#[tokio::test]
async fn register_success_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u3", "name": "carol", "email": encrypted_email_json("carol@example.com")}
        })))
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    let outcome = session.register(&json!({"name": "carol"})).await;

    assert!(outcome.success);
    assert!(session.snapshot().authenticated);
    assert_eq!(user_email(&session.snapshot()).as_deref(), Some("carol@example.com"));
    assert_eq!(notifier.successes(), vec!["Registration successful!"]);
}

#[tokio::test]
async fn register_failure_reports_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Email already taken"})))
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    let outcome = session.register(&json!({})).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Email already taken"));
    assert!(!session.snapshot().authenticated);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn logout_clears_cache_and_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u1", "name": "alice", "email": "a@b.com"}
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let (session, notifier, api) = session_against(&server).await;
    session.ensure_checked().await;
    assert!(session.snapshot().authenticated);
    assert!(!api.cache().is_empty(), "the session check is a cached GET");

    session.logout().await;

    assert_eq!(session.phase(), SessionPhase::Anonymous);
    assert!(session.snapshot().user.is_none());
    assert!(api.cache().is_empty());
    assert!(notifier.successes().contains(&"Logged out successfully".to_owned()));

    // Guard was reset: the next mount re-validates (second /auth/me call).
    session.ensure_checked().await;
}

#[tokio::test]
async fn logout_survives_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (session, notifier, _) = session_against(&server).await;
    session.logout().await;

    assert_eq!(session.phase(), SessionPhase::Anonymous);
    assert!(notifier.successes().contains(&"Logged out successfully".to_owned()));
}

// =============================================================================
// Subscription
// =============================================================================

#[tokio::test]
async fn subscribers_observe_transitions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "u1", "name": "alice", "email": "a@b.com"}
        })))
        .mount(&server)
        .await;

    let (session, _, _) = session_against(&server).await;
    let mut rx = session.subscribe();
    assert!(rx.borrow().loading);

    session.login(&json!({})).await;
    rx.changed().await.unwrap();

    let snapshot = rx.borrow_and_update().clone();
    assert!(snapshot.authenticated);
    assert!(!snapshot.loading);
}
