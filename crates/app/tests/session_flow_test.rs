//! End-to-end session flows: app client, auth machine, file storage and a
//! scripted transport standing in for the backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tether_application::ports::{Transport, TransportError};
use tether_application::{AppClient, AuthListener, AuthMachine, ClientConfig, SessionError};
use tether_domain::{AuthUser, BasicRequest, Credential, Response, UserId};
use tether_infrastructure::{FileUserStorage, SystemClock};

#[derive(Default)]
struct FakeBackend {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<BasicRequest>>,
}

impl FakeBackend {
    fn reply(&self, status: u16, body: &Value) {
        self.responses.lock().push_back(Response::json(status, body));
    }

    fn reply_invalid_session(&self) {
        self.reply(
            401,
            &json!({"error": "invalid session", "error_code": "InvalidSession"}),
        );
    }

    fn requests(&self) -> Vec<BasicRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn round_trip(&self, request: BasicRequest) -> Result<Response, TransportError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::Other("no scripted response".to_string()))
    }
}

#[derive(Default)]
struct ChangeLog {
    changes: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl AuthListener for ChangeLog {
    fn on_active_user_changed(
        &self,
        _auth: &AuthMachine,
        current: Option<&AuthUser>,
        previous: Option<&AuthUser>,
    ) {
        self.changes.lock().push((
            previous.map(|u| u.id.to_string()),
            current.map(|u| u.id.to_string()),
        ));
    }
}

struct Fixture {
    _dir: TempDir,
    storage_path: std::path::PathBuf,
    backend: Arc<FakeBackend>,
    client: AppClient,
}

fn config() -> ClientConfig {
    ClientConfig::new("https://backend.test", "app-1")
}

async fn open(storage_path: &std::path::Path, backend: Arc<FakeBackend>) -> AppClient {
    AppClient::new(
        &config(),
        backend,
        Arc::new(FileUserStorage::new(storage_path)),
        Arc::new(SystemClock::new()),
    )
    .await
    .unwrap()
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let storage_path = dir.path().join("users.json");
    let backend = Arc::new(FakeBackend::default());
    let client = open(&storage_path, backend.clone()).await;
    Fixture {
        _dir: dir,
        storage_path,
        backend,
        client,
    }
}

async fn login_u1(f: &Fixture) {
    f.backend.reply(
        200,
        &json!({"user_id": "u1", "device_id": "d1", "access_token": "t1", "refresh_token": "r1"}),
    );
    f.client
        .auth()
        .login(Credential::user_password("a@b.c", "pw"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_session_is_refreshed_and_retried() {
    let f = fixture().await;
    login_u1(&f).await;
    f.backend.reply_invalid_session();
    f.backend.reply(200, &json!({"access_token": "t2"}));
    f.backend.reply(200, &json!(42));

    let result: i64 = f.client.call_function("answer", vec![]).await.unwrap();

    assert_eq!(result, 42);
    let requests = f.backend.requests();
    // login + original + refresh + retry
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].headers.get("Authorization"), Some("Bearer t1"));
    assert_eq!(requests[2].headers.get("Authorization"), Some("Bearer r1"));
    assert_eq!(requests[3].headers.get("Authorization"), Some("Bearer t2"));
    assert_eq!(requests[1].body, requests[3].body);
}

#[tokio::test]
async fn test_logged_out_call_makes_no_request() {
    let f = fixture().await;

    let error = f
        .client
        .call_function::<Value>("answer", vec![])
        .await
        .unwrap_err();

    assert!(matches!(error, SessionError::MustAuthenticateFirst));
    assert!(f.backend.requests().is_empty());
}

#[tokio::test]
async fn test_rejected_refresh_logs_out_and_is_observable() {
    let f = fixture().await;
    login_u1(&f).await;
    let log = Arc::new(ChangeLog::default());
    f.client.auth().add_listener(log.clone());
    f.backend.reply_invalid_session();
    f.backend.reply_invalid_session();

    let error = f
        .client
        .call_function::<Value>("answer", vec![])
        .await
        .unwrap_err();

    assert!(matches!(error, SessionError::InvalidSession { .. }));
    assert_eq!(f.backend.requests().len(), 3);
    assert!(!f.client.auth().is_logged_in());
    assert_eq!(
        *log.changes.lock(),
        vec![(Some("u1".to_string()), None)]
    );
}

#[tokio::test]
async fn test_login_survives_restart() {
    let f = fixture().await;
    login_u1(&f).await;

    let reopened = open(&f.storage_path, f.backend.clone()).await;

    let user = reopened.auth().active_user().unwrap();
    assert_eq!(user.id, UserId::new("u1"));
    assert_eq!(
        reopened.auth().active_credentials().unwrap().refresh_token.as_deref(),
        Some("r1")
    );
}

#[tokio::test]
async fn test_login_calls_logout_cycle() {
    let f = fixture().await;
    let log = Arc::new(ChangeLog::default());
    f.client.auth().add_listener(log.clone());
    login_u1(&f).await;
    for value in 0..3 {
        f.backend.reply(200, &json!(value));
        let got: i64 = f.client.call_function("next", vec![]).await.unwrap();
        assert_eq!(got, value);
    }
    f.backend.reply(204, &Value::Null);

    f.client.auth().logout().await.unwrap();

    assert!(f.client.auth().active_user().is_none());
    let changes = log.changes.lock().clone();
    assert_eq!(changes.first(), Some(&(None, Some("u1".to_string()))));
    assert_eq!(changes.last(), Some(&(Some("u1".to_string()), None)));

    let reopened = open(&f.storage_path, f.backend.clone()).await;
    assert!(!reopened.auth().is_logged_in());
}

#[tokio::test]
async fn test_switching_to_active_user_keeps_registry_intact() {
    let f = fixture().await;
    login_u1(&f).await;
    let log = Arc::new(ChangeLog::default());
    f.client.auth().add_listener(log.clone());
    let before = std::fs::read_to_string(&f.storage_path).unwrap();

    f.client
        .auth()
        .switch_active_user(&UserId::new("u1"))
        .await
        .unwrap();

    assert_eq!(
        *log.changes.lock(),
        vec![(Some("u1".to_string()), Some("u1".to_string()))]
    );
    let after: Value =
        serde_json::from_str(&std::fs::read_to_string(&f.storage_path).unwrap()).unwrap();
    let before: Value = serde_json::from_str(&before).unwrap();
    assert_eq!(after["users"].as_array().unwrap().len(), 1);
    assert_eq!(after["active_user_id"], before["active_user_id"]);
    assert_eq!(after["users"][0]["credentials"], before["users"][0]["credentials"]);
}
