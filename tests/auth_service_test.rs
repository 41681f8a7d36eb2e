//! Account flow integration tests using wiremock
//!
//! Covers sign-up, sign-in (password and Google), account verification,
//! explicit refresh and sign-out against a mock API, and checks what each
//! flow leaves in the credential store and in durable storage.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authlink::auth::service::SignUpRequest;
use authlink::auth::storage::{
    DurableStorage, FileStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, THEME_KEY,
};
use authlink::client::AuthlinkClient;
use authlink::error::AuthlinkError;
use authlink::http::request::PendingRequest;
use authlink::SessionState;

const SIGNUP_PATH: &str = "/api/v1/auth/signup/";
const SIGNIN_PATH: &str = "/api/v1/auth/signin/token/";
const GOOGLE_PATH: &str = "/api/v1/auth/signin/google/";
const REFRESH_PATH: &str = "/api/v1/auth/signin/token/refresh/";
const SIGNOUT_PATH: &str = "/api/v1/auth/signout/";
const VERIFY_PATH: &str = "/api/v1/auth/verify-user-account/confirm/";
const USER_PATH: &str = "/api/v1/auth/user/";

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sign_in_stores_and_persists_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNIN_PATH))
        .and(body_json(json!({"email": "a@b.com", "password": "x"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "T1", "refresh_token": "R1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = common::client_with_entries(&server.uri(), &[]);
    let mut states = client.store().subscribe();

    let credential = client
        .auth()
        .sign_in("a@b.com", "x")
        .await
        .expect("sign-in succeeds");

    assert_eq!(credential.access_token.as_deref(), Some("T1"));
    assert_eq!(credential.refresh_token.as_deref(), Some("R1"));
    assert_eq!(client.store().state(), SessionState::Authenticated);
    assert!(states.has_changed().unwrap());
    assert_eq!(states.borrow_and_update().state, SessionState::Authenticated);

    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("T1"));
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
    server.verify().await;
}

#[tokio::test]
async fn test_sign_in_accepts_short_field_names() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNIN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "T1", "refresh": "R1"})),
        )
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    client.auth().sign_in("a@b.com", "x").await.unwrap();

    assert_eq!(client.store().refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_wrong_password_does_not_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNIN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T2"})))
        .expect(0)
        .mount(&server)
        .await;

    // A stale session is present; the failed sign-in must not touch it.
    let (client, _) = common::signed_in_client(&server.uri());
    let err = client.auth().sign_in("a@b.com", "wrong").await.unwrap_err();

    assert!(matches!(err, AuthlinkError::Http { status: 401, .. }));
    assert_eq!(client.store().access_token().as_deref(), Some("T1"));
    assert_eq!(client.store().state(), SessionState::Authenticated);
    server.verify().await;
}

#[tokio::test]
async fn test_failed_sign_in_settles_to_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNIN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "email": ["This field may not be blank."]
        })))
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client.auth().sign_in("", "x").await.unwrap_err();

    match err {
        AuthlinkError::Validation { fields } => {
            assert_eq!(fields["email"], vec!["This field may not be blank."]);
        }
        other => panic!("expected Validation error, got {other:?}"),
    }
    assert_eq!(client.store().state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_sign_in_persists_across_clients_with_file_storage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "T1", "refresh_token": "R1"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    let config = common::mock_config(&server.uri());

    let first = AuthlinkClient::with_storage(&config, Arc::new(FileStorage::new(&file))).unwrap();
    first.auth().sign_in("a@b.com", "x").await.unwrap();

    let second = AuthlinkClient::with_storage(&config, Arc::new(FileStorage::new(&file))).unwrap();
    assert_eq!(second.store().access_token().as_deref(), Some("T1"));
    assert_eq!(second.store().refresh_token().as_deref(), Some("R1"));
    assert_eq!(second.store().state(), SessionState::Authenticated);
}

// ---------------------------------------------------------------------------
// Google sign-in
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_google_sign_in_requires_client_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GOOGLE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client
        .auth()
        .sign_in_with_google("google-id-token")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthlinkError::Config(_)));
    assert_eq!(client.store().state(), SessionState::Unauthenticated);
    server.verify().await;
}

#[tokio::test]
async fn test_google_sign_in_exchanges_credential() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GOOGLE_PATH))
        .and(body_json(json!({
            "credential": "google-id-token",
            "client_id": "123.apps.googleusercontent.com"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "G1", "refresh_token": "GR1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = common::mock_config(&server.uri());
    config.oauth.google_client_id = Some("123.apps.googleusercontent.com".to_string());
    let client =
        AuthlinkClient::with_storage(&config, Arc::new(authlink::auth::storage::MemoryStorage::default()))
            .unwrap();

    client
        .auth()
        .sign_in_with_google("google-id-token")
        .await
        .unwrap();

    assert_eq!(client.store().access_token().as_deref(), Some("G1"));
    assert_eq!(client.store().refresh_token().as_deref(), Some("GR1"));
    server.verify().await;
}

// ---------------------------------------------------------------------------
// Sign-up and verification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sign_up_rejects_bad_input_without_network_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNUP_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client
        .auth()
        .sign_up(&SignUpRequest::new("not-an-email", ""))
        .await
        .unwrap_err();

    match err {
        AuthlinkError::Validation { fields } => {
            assert!(fields.contains_key("email"));
            assert!(fields.contains_key("password"));
        }
        other => panic!("expected Validation error, got {other:?}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_sign_up_creates_account_without_signing_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNUP_PATH))
        .and(body_json(json!({
            "email": "a@b.com",
            "password": "s3cret-pass",
            "first_name": "Ada"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "email": "a@b.com",
            "first_name": "Ada",
            "is_verified": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let mut request = SignUpRequest::new("a@b.com", "s3cret-pass");
    request.first_name = Some("Ada".to_string());

    let user = client.auth().sign_up(&request).await.unwrap();

    assert_eq!(user.email, "a@b.com");
    assert_eq!(user.is_verified, Some(false));
    assert!(client.store().get().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_sign_up_surfaces_server_field_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNUP_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "email": ["user with this email already exists."],
            "password": ["This password is too common.", "This password is entirely numeric."]
        })))
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client
        .auth()
        .sign_up(&SignUpRequest::new("a@b.com", "12345678"))
        .await
        .unwrap_err();

    match err {
        AuthlinkError::Validation { fields } => {
            assert_eq!(fields["email"], vec!["user with this email already exists."]);
            assert_eq!(fields["password"].len(), 2);
        }
        other => panic!("expected Validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_verify_account_posts_uid_and_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .and(body_json(json!({"uid": "MQ", "token": "c2b-abc123"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let body = client
        .auth()
        .verify_account("MQ", "c2b-abc123")
        .await
        .unwrap();

    assert!(body.is_null());
    server.verify().await;
}

#[tokio::test]
async fn test_verify_account_with_expired_link() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"token": ["Invalid token for given user."]})),
        )
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client.auth().verify_account("MQ", "stale").await.unwrap_err();

    assert!(matches!(err, AuthlinkError::Validation { .. }));
}

// ---------------------------------------------------------------------------
// Current user and explicit refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_current_user_without_session_makes_no_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client.auth().current_user().await.unwrap_err();

    assert!(matches!(err, AuthlinkError::NotAuthenticated));
    server.verify().await;
}

#[tokio::test]
async fn test_explicit_refresh_replaces_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = common::signed_in_client(&server.uri());
    let token = client.auth().refresh().await.unwrap();

    assert_eq!(token, "T2");
    assert_eq!(client.store().refresh_token().as_deref(), Some("R1"));
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("T2"));
    server.verify().await;
}

#[tokio::test]
async fn test_explicit_refresh_without_session_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = common::client_with_entries(&server.uri(), &[]);
    let err = client.auth().refresh().await.unwrap_err();

    assert!(matches!(err, AuthlinkError::RefreshFailed(_)));
    server.verify().await;
}

// ---------------------------------------------------------------------------
// Sign-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sign_out_revokes_and_clears() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNOUT_PATH))
        .and(header("Authorization", "Bearer T1"))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = common::client_with_entries(
        &server.uri(),
        &[("access_token", "T1"), ("refresh_token", "R1"), ("theme", "dark")],
    );
    client.auth().sign_out().await.unwrap();

    assert!(client.store().get().is_empty());
    assert_eq!(client.store().state(), SessionState::Unauthenticated);
    assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    // Preferences survive sign-out.
    assert_eq!(storage.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    server.verify().await;
}

#[tokio::test]
async fn test_sign_out_without_refresh_token_is_local() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNOUT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, storage) = common::client_with_entries(&server.uri(), &[("access_token", "T1")]);
    client.auth().sign_out().await.unwrap();

    assert!(client.store().get().is_empty());
    assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_failed_sign_out_keeps_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNOUT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = common::signed_in_client(&server.uri());
    let err = client.auth().sign_out().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(client.store().access_token().as_deref(), Some("T1"));
    assert_eq!(client.store().refresh_token().as_deref(), Some("R1"));
    server.verify().await;
}

#[tokio::test]
async fn test_sign_out_during_refresh_stays_signed_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "T2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .and(header("Authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "email": "a@b.com"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(SIGNOUT_PATH))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = common::signed_in_client(&server.uri());
    let (_, signed_out) = futures::future::join(
        client.dispatcher().send(PendingRequest::get(USER_PATH)),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            client.auth().sign_out().await
        },
    )
    .await;

    assert!(signed_out.is_ok(), "sign-out failed: {signed_out:?}");
    assert!(client.store().get().is_empty());
    assert_eq!(client.store().state(), SessionState::Unauthenticated);
    assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_sign_out_retry_sends_rotated_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SIGNOUT_PATH))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "T2", "refresh": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(SIGNOUT_PATH))
        .and(header("Authorization", "Bearer T2"))
        .and(body_json(json!({"refresh_token": "R2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = common::signed_in_client(&server.uri());
    client.auth().sign_out().await.unwrap();

    assert!(client.store().get().is_empty());
    assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    server.verify().await;
}
