use super::*;
use crate::error::{StorageError, TransportError};
use crate::storage::{FileStore, MemoryStore};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// =========================================================================
// MockApi
// =========================================================================

struct MockApi {
    replies: Mutex<VecDeque<Result<RawReply, TransportError>>>,
    calls: Mutex<Vec<Endpoint>>,
}

impl MockApi {
    fn with(replies: Vec<Result<RawReply, TransportError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), calls: Mutex::default() })
    }

    fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuthApi for MockApi {
    async fn send(&self, endpoint: Endpoint) -> Result<RawReply, TransportError> {
        self.calls.lock().unwrap().push(endpoint);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".into())))
    }
}

/// Store whose writes always fail; reads see an empty map.
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: "readonly".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

fn ann() -> UserProfile {
    UserProfile {
        name: "Ann".into(),
        username: "ann1".into(),
        email: "a@b.com".into(),
        created_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn ann_json() -> serde_json::Value {
    json!({ "name": "Ann", "username": "ann1", "email": "a@b.com", "created_at": "2025-01-01T00:00:00Z" })
}

fn grant_reply(token: &str) -> Result<RawReply, TransportError> {
    let body = json!({
        "success": true,
        "message": "ok",
        "data": { "access_token": token, "token_type": "bearer", "user": ann_json() }
    });
    Ok(RawReply::new(200, body.to_string()))
}

fn me_reply() -> Result<RawReply, TransportError> {
    Ok(RawReply::new(200, json!({ "success": true, "data": { "user": ann_json() } }).to_string()))
}

fn sign_up_request() -> SignUpRequest {
    SignUpRequest {
        name: "Ann".into(),
        username: "ann1".into(),
        email: "a@b.com".into(),
        password: "pw123456".into(),
        confirm_password: "pw123456".into(),
    }
}

fn sign_in_request() -> SignInRequest {
    SignInRequest { identifier: "a@b.com".into(), password: "pw123456".into() }
}

/// Manager over a store already holding token `tok1` and Ann's profile.
fn signed_in(
    replies: Vec<Result<RawReply, TransportError>>,
) -> (SessionManager<Arc<MockApi>, MemoryStore>, Arc<MockApi>) {
    let store = MemoryStore::new();
    store.set(TOKEN_KEY, "tok1").unwrap();
    store.set(USER_KEY, &ann_json().to_string()).unwrap();
    let api = MockApi::with(replies);
    (SessionManager::new(api.clone(), store), api)
}

// =========================================================================
// hydration
// =========================================================================

#[test]
fn new_with_empty_store_is_unauthenticated() {
    let session = SessionManager::new(MockApi::with(vec![]), MemoryStore::new());
    assert!(!session.is_authenticated());
    assert!(session.token().is_none());
    assert!(session.user().is_none());
}

#[test]
fn new_restores_persisted_session() {
    let store = MemoryStore::new();
    store.set(TOKEN_KEY, "abc").unwrap();
    store.set(USER_KEY, &serde_json::to_string(&ann()).unwrap()).unwrap();

    let session = SessionManager::new(MockApi::with(vec![]), store);
    assert!(session.is_authenticated());
    assert_eq!(session.token(), Some("abc"));
    assert_eq!(session.user(), Some(&ann()));
}

#[test]
fn new_discards_corrupt_user_but_keeps_token() {
    let store = MemoryStore::new();
    store.set(TOKEN_KEY, "abc").unwrap();
    store.set(USER_KEY, "{not json").unwrap();

    let session = SessionManager::new(MockApi::with(vec![]), store.clone());
    assert!(session.is_authenticated());
    assert!(session.user().is_none());
    assert!(!store.contains(USER_KEY));
    assert!(store.contains(TOKEN_KEY));
}

// =========================================================================
// sign_up / sign_in
// =========================================================================

#[tokio::test]
async fn sign_up_success_adopts_and_persists() {
    let store = MemoryStore::new();
    let api = MockApi::with(vec![grant_reply("tok1")]);
    let mut session = SessionManager::new(api.clone(), store.clone());

    let outcome = session.sign_up(sign_up_request()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.message, "ok");
    assert_eq!(outcome.user, Some(ann()));
    assert!(session.is_authenticated());
    assert_eq!(session.token(), Some("tok1"));
    assert_eq!(session.user(), Some(&ann()));
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok1"));
    let persisted: UserProfile = serde_json::from_str(&store.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(persisted, ann());
    assert_eq!(api.calls(), vec![Endpoint::SignUp(sign_up_request())]);
}

#[tokio::test]
async fn sign_in_success_adopts() {
    let api = MockApi::with(vec![grant_reply("tok2")]);
    let mut session = SessionManager::new(api.clone(), MemoryStore::new());

    let outcome = session.sign_in(sign_in_request()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(session.token(), Some("tok2"));
    assert!(matches!(&api.calls()[0], Endpoint::SignIn(r) if r.identifier == "a@b.com"));
}

#[tokio::test]
async fn sign_in_rejection_leaves_session_unchanged() {
    let body = json!({ "detail": "Invalid credentials" }).to_string();
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(401, body))]);

    let outcome = session.sign_in(sign_in_request()).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Invalid credentials");
    assert!(outcome.user.is_none());
    assert_eq!(session.token(), Some("tok1"));
    assert_eq!(session.user(), Some(&ann()));
    assert_eq!(session.store().get(TOKEN_KEY).unwrap().as_deref(), Some("tok1"));
}

#[tokio::test]
async fn sign_up_explicit_failure_passes_message_through() {
    let body = json!({ "success": false, "message": "Email already registered" }).to_string();
    let mut session = SessionManager::new(MockApi::with(vec![Ok(RawReply::new(400, body))]), MemoryStore::new());

    let outcome = session.sign_up(sign_up_request()).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Email already registered");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn sign_up_success_without_grant_does_not_adopt() {
    let body = json!({ "success": true, "message": "Account created", "data": { "user": ann_json() } }).to_string();
    let store = MemoryStore::new();
    let mut session = SessionManager::new(MockApi::with(vec![Ok(RawReply::new(201, body))]), store.clone());

    let outcome = session.sign_up(sign_up_request()).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Account created");
    assert!(!session.is_authenticated());
    assert!(!store.contains(TOKEN_KEY));
}

#[tokio::test]
async fn sign_in_success_flag_with_error_status_does_not_adopt() {
    let reply = grant_reply("tok9").map(|r| RawReply::new(500, r.body));
    let mut session = SessionManager::new(MockApi::with(vec![reply]), MemoryStore::new());

    let outcome = session.sign_in(sign_in_request()).await.unwrap();
    assert!(!outcome.success);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn sign_in_transport_failure_is_network_error() {
    let (mut session, _api) = signed_in(vec![Err(TransportError::Request("connection refused".into()))]);

    let err = session.sign_in(sign_in_request()).await.unwrap_err();
    assert!(matches!(err, NetworkError::Transport(_)));
    assert_eq!(err.user_message(), "Network error occurred. Please try again.");
    assert_eq!(session.token(), Some("tok1"));
}

#[tokio::test]
async fn sign_in_malformed_body_is_network_error() {
    let mut session =
        SessionManager::new(MockApi::with(vec![Ok(RawReply::new(502, "<html>bad gateway</html>"))]), MemoryStore::new());

    let err = session.sign_in(sign_in_request()).await.unwrap_err();
    assert!(matches!(err, NetworkError::MalformedBody { status: 502, .. }));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn sign_up_storage_failure_does_not_adopt() {
    let mut session = SessionManager::new(MockApi::with(vec![grant_reply("tok1")]), ReadOnlyStore);

    let err = session.sign_up(sign_up_request()).await.unwrap_err();
    assert!(matches!(err, NetworkError::Storage(_)));
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
}

// =========================================================================
// sign_out
// =========================================================================

#[tokio::test]
async fn sign_out_notifies_backend_and_clears() {
    let (mut session, api) = signed_in(vec![Ok(RawReply::new(200, "{}"))]);

    session.sign_out().await;
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
    assert!(!session.store().contains(TOKEN_KEY));
    assert!(!session.store().contains(USER_KEY));
    assert_eq!(api.calls(), vec![Endpoint::Logout { token: "tok1".into() }]);
}

#[tokio::test]
async fn sign_out_clears_even_when_backend_unreachable() {
    let (mut session, _api) = signed_in(vec![Err(TransportError::Request("timed out".into()))]);

    session.sign_out().await;
    assert!(!session.is_authenticated());
    assert!(!session.store().contains(TOKEN_KEY));
    assert!(!session.store().contains(USER_KEY));
}

#[tokio::test]
async fn sign_out_without_token_skips_backend() {
    let store = MemoryStore::new();
    store.set(USER_KEY, &ann_json().to_string()).unwrap();
    let api = MockApi::with(vec![]);
    let mut session = SessionManager::new(api.clone(), store.clone());

    session.sign_out().await;
    assert!(api.calls().is_empty());
    assert!(session.user().is_none());
    assert!(!store.contains(USER_KEY));
}

// =========================================================================
// current_user
// =========================================================================

#[tokio::test]
async fn current_user_without_token_makes_no_call() {
    let api = MockApi::with(vec![me_reply()]);
    let mut session = SessionManager::new(api.clone(), MemoryStore::new());

    assert!(session.current_user().await.is_none());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn current_user_refreshes_cache() {
    let store = MemoryStore::new();
    store.set(TOKEN_KEY, "tok1").unwrap();
    let api = MockApi::with(vec![me_reply()]);
    let mut session = SessionManager::new(api.clone(), store.clone());

    assert_eq!(session.current_user().await, Some(ann()));
    assert_eq!(session.user(), Some(&ann()));
    assert!(store.contains(USER_KEY));
    assert_eq!(api.calls(), vec![Endpoint::Me { token: "tok1".into() }]);
}

#[tokio::test]
async fn current_user_unauthorized_clears_session() {
    let body = json!({ "detail": "Could not validate credentials" }).to_string();
    let (mut session, api) = signed_in(vec![Ok(RawReply::new(401, body))]);

    assert!(session.current_user().await.is_none());
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
    assert!(!session.store().contains(TOKEN_KEY));
    assert!(!session.store().contains(USER_KEY));
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn current_user_server_error_keeps_session() {
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(500, r#"{"detail":"boom"}"#))]);

    assert!(session.current_user().await.is_none());
    assert_eq!(session.token(), Some("tok1"));
    assert_eq!(session.user(), Some(&ann()));
}

#[tokio::test]
async fn current_user_transport_error_keeps_session() {
    let (mut session, _api) = signed_in(vec![Err(TransportError::Request("reset".into()))]);

    assert!(session.current_user().await.is_none());
    assert!(session.is_authenticated());
    assert!(session.store().contains(TOKEN_KEY));
}

#[tokio::test]
async fn current_user_malformed_body_keeps_session() {
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(200, "not json"))]);

    assert!(session.current_user().await.is_none());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn current_user_forbidden_is_not_invalidation() {
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(403, r#"{"detail":"Not authenticated"}"#))]);

    assert!(session.current_user().await.is_none());
    assert!(session.is_authenticated());
}

// =========================================================================
// dashboard / health
// =========================================================================

#[tokio::test]
async fn dashboard_returns_user_and_message() {
    let body = json!({ "success": true, "message": "Dashboard data retrieved successfully", "data": { "user": ann_json() } });
    let (mut session, api) = signed_in(vec![Ok(RawReply::new(200, body.to_string()))]);

    let data = session.dashboard().await.unwrap();
    assert_eq!(data.message, "Dashboard data retrieved successfully");
    assert_eq!(data.user, ann());
    assert_eq!(api.calls(), vec![Endpoint::Dashboard { token: "tok1".into() }]);
}

#[tokio::test]
async fn dashboard_unauthorized_clears_session() {
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(401, r#"{"detail":"Invalid or expired token"}"#))]);

    assert!(session.dashboard().await.is_none());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn dashboard_success_false_is_none_and_keeps_session() {
    let body = json!({ "success": false, "message": "Dashboard unavailable", "data": { "user": ann_json() } });
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(200, body.to_string()))]);

    assert!(session.dashboard().await.is_none());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn current_user_success_false_keeps_cached_user() {
    let renamed = json!({ "name": "Changed", "username": "ann1", "email": "a@b.com", "created_at": "2025-01-01T00:00:00Z" });
    let body = json!({ "success": false, "data": { "user": renamed } });
    let (mut session, _api) = signed_in(vec![Ok(RawReply::new(200, body.to_string()))]);

    assert!(session.current_user().await.is_none());
    assert_eq!(session.user(), Some(&ann()));
}

#[tokio::test]
async fn dashboard_without_token_makes_no_call() {
    let api = MockApi::with(vec![]);
    let mut session = SessionManager::new(api.clone(), MemoryStore::new());
    assert!(session.dashboard().await.is_none());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn health_parses_status() {
    let body = json!({ "success": true, "message": "API is running successfully", "data": { "status": "healthy", "version": "1.0.0" } });
    let session = SessionManager::new(MockApi::with(vec![Ok(RawReply::new(200, body.to_string()))]), MemoryStore::new());

    let health = session.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn health_error_status_is_error() {
    let session = SessionManager::new(MockApi::with(vec![Ok(RawReply::new(503, "{}"))]), MemoryStore::new());
    assert!(session.health().await.is_err());
}

// =========================================================================
// scenarios
// =========================================================================

#[tokio::test]
async fn persisted_session_survives_restart() {
    let store = MemoryStore::new();
    {
        let mut first = SessionManager::new(MockApi::with(vec![grant_reply("abc")]), store.clone());
        first.sign_in(sign_in_request()).await.unwrap();
    }

    let second = SessionManager::new(MockApi::with(vec![]), store);
    assert!(second.is_authenticated());
    assert_eq!(second.token(), Some("abc"));
    assert_eq!(second.user(), Some(&ann()));
}

#[tokio::test]
async fn sign_up_then_expired_token_round_trip() {
    let store = MemoryStore::new();
    let api = MockApi::with(vec![grant_reply("tok1"), Ok(RawReply::new(401, "{}"))]);
    let mut session = SessionManager::new(api.clone(), store.clone());

    assert!(session.sign_up(sign_up_request()).await.unwrap().success);
    assert!(store.contains(TOKEN_KEY) && store.contains(USER_KEY));

    assert!(session.current_user().await.is_none());
    assert!(!session.is_authenticated());
    assert!(!store.contains(TOKEN_KEY) && !store.contains(USER_KEY));
    assert_eq!(api.calls()[1], Endpoint::Me { token: "tok1".into() });
}

#[tokio::test]
async fn sign_in_recovers_from_corrupt_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{truncated").unwrap();

    let mut session = SessionManager::new(MockApi::with(vec![grant_reply("tok1")]), FileStore::new(&path));
    assert!(!session.is_authenticated());

    let outcome = session.sign_in(sign_in_request()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(FileStore::new(&path).get(TOKEN_KEY).unwrap().as_deref(), Some("tok1"));

    session.sign_out().await;
    let reopened = SessionManager::new(MockApi::with(vec![]), FileStore::new(&path));
    assert!(!reopened.is_authenticated());
}
