use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use crate::workflows::moveout::collaborators::{
    object_key, BlobError, BlobStore, EmailMessage, Notifier, NotifyError,
};
use crate::workflows::moveout::exit_requests::ExitRequestSubmission;
use crate::workflows::moveout::identity::{SessionManager, UserRegistry};
use crate::workflows::moveout::memory::InMemoryRecordStore;
use crate::workflows::moveout::{moveout_router, MoveOutState};

pub(super) const BOUNDARY: &str = "moveout-test-boundary";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StoredBlob {
    pub(super) key: String,
    pub(super) filename: String,
    pub(super) len: usize,
}

#[derive(Default)]
pub(super) struct RecordingBlobStore {
    stored: Mutex<Vec<StoredBlob>>,
}

impl RecordingBlobStore {
    pub(super) fn stored(&self) -> Vec<StoredBlob> {
        self.stored.lock().expect("blob mutex poisoned").clone()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn store(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> Result<String, BlobError> {
        let key = object_key(folder, &uuid::Uuid::new_v4().to_string(), filename)?;
        self.stored
            .lock()
            .expect("blob mutex poisoned")
            .push(StoredBlob {
                key: key.clone(),
                filename: filename.to_string(),
                len: bytes.len(),
            });
        Ok(format!("memory://{key}"))
    }
}

pub(super) struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn store(
        &self,
        _bytes: Vec<u8>,
        _filename: &str,
        _folder: &str,
    ) -> Result<String, BlobError> {
        Err(BlobError::Upload("bucket offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(message);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: EmailMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay unreachable".to_string()))
    }
}

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryRecordStore>,
    pub(super) blobs: Arc<RecordingBlobStore>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) state: MoveOutState,
}

impl Harness {
    pub(super) fn router(&self) -> Router {
        moveout_router(self.state.clone())
    }
}

pub(super) fn sessions() -> Arc<SessionManager> {
    Arc::new(SessionManager::new("moveout-test-secret", Duration::minutes(30)))
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryRecordStore::new());
    let blobs = Arc::new(RecordingBlobStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = MoveOutState::new(
        store.clone(),
        blobs.clone(),
        notifier.clone(),
        UserRegistry::demo(),
        sessions(),
    );
    Harness {
        store,
        blobs,
        notifier,
        state,
    }
}

/// State whose blob store and notifier always fail.
pub(super) fn failing_state(store: Arc<InMemoryRecordStore>) -> MoveOutState {
    MoveOutState::new(
        store,
        Arc::new(FailingBlobStore),
        Arc::new(FailingNotifier),
        UserRegistry::demo(),
        sessions(),
    )
}

pub(super) fn submission(tenant_id: &str) -> ExitRequestSubmission {
    ExitRequestSubmission {
        tenant_id: tenant_id.to_string(),
        name: "A".to_string(),
        room_number: "101".to_string(),
        exit_reason: "job".to_string(),
        email: "a@x.com".to_string(),
        moveout_checklist: vec!["Return keys".to_string()],
        supporting_document: None,
    }
}

pub(super) struct FilePart<'a> {
    pub(super) field: &'a str,
    pub(super) filename: &'a str,
    pub(super) bytes: &'a [u8],
}

pub(super) fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                file.field, file.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub(super) fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub(super) fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub(super) async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("router responds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}

/// Logs in through the HTTP surface and returns the `Cookie` header value to replay.
pub(super) async fn login(router: &Router, username: &str, password: &str) -> String {
    let response = send(
        router,
        json_request(
            Method::POST,
            "/login",
            serde_json::json!({ "username": username, "password": password }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login as {username}");
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("set-cookie header");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}
