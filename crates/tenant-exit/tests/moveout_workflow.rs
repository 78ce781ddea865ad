//! End-to-end move-out scenarios driven through the public services and router.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::response::Response;
    use axum::Router;
    use chrono::Duration;
    use serde_json::Value;
    use tower::ServiceExt;

    use tenant_exit::workflows::moveout::collaborators::object_key;
    use tenant_exit::workflows::moveout::{
        moveout_router, BlobError, BlobStore, EmailMessage, InMemoryRecordStore, MoveOutState,
        Notifier, NotifyError, SessionManager, UserRegistry,
    };

    pub(super) struct KeyOnlyBlobs;

    #[async_trait]
    impl BlobStore for KeyOnlyBlobs {
        async fn store(
            &self,
            _bytes: Vec<u8>,
            filename: &str,
            folder: &str,
        ) -> Result<String, BlobError> {
            let key = object_key(folder, "fixed", filename)?;
            Ok(format!("https://files.test/{key}"))
        }
    }

    #[derive(Default)]
    pub(super) struct Outbox {
        pub(super) messages: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Notifier for Outbox {
        async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
            self.messages
                .lock()
                .expect("outbox mutex poisoned")
                .push(message);
            Ok(())
        }
    }

    pub(super) fn state(outbox: Arc<Outbox>) -> MoveOutState {
        MoveOutState::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(KeyOnlyBlobs),
            outbox,
            UserRegistry::demo(),
            Arc::new(SessionManager::new("integration-secret", Duration::hours(1))),
        )
    }

    pub(super) fn router(state: &MoveOutState) -> Router {
        moveout_router(state.clone())
    }

    pub(super) fn request(
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    pub(super) async fn call(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.expect("router responds")
    }

    pub(super) async fn json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    pub(super) async fn login(router: &Router, username: &str, password: &str) -> String {
        let response = call(
            router,
            request(
                Method::POST,
                "/login",
                Some(serde_json::json!({ "username": username, "password": password })),
                None,
            ),
        )
        .await;
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .expect("session cookie")
            .to_string()
    }
}

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{call, json, login, request, router, state, Outbox};
use tenant_exit::workflows::moveout::{ExitRequestSubmission, RequestStatus, ServiceError};

fn submission() -> ExitRequestSubmission {
    ExitRequestSubmission {
        tenant_id: "T1".to_string(),
        name: "A".to_string(),
        room_number: "101".to_string(),
        exit_reason: "job".to_string(),
        email: "a@x.com".to_string(),
        ..ExitRequestSubmission::default()
    }
}

#[tokio::test]
async fn submit_list_approve_and_reject_bogus_status() {
    let outbox = Arc::new(Outbox::default());
    let state = state(outbox.clone());

    let receipt = state.exit_requests.submit(submission()).await.expect("submits");
    let listed = state.exit_requests.list_by_tenant("T1").await.expect("lists");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].request_status, RequestStatus::Pending);

    state
        .exit_requests
        .update_status(&receipt.request_id, "Approved")
        .await
        .expect("approves");
    let err = state
        .exit_requests
        .update_status(&receipt.request_id, "Bogus")
        .await
        .expect_err("bogus status");
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let listed = state.exit_requests.list_by_tenant("T1").await.expect("lists");
    assert_eq!(listed[0].request_status, RequestStatus::Approved);
    assert_eq!(outbox.messages.lock().expect("outbox").len(), 1);
}

#[tokio::test]
async fn admin_dashboard_tracks_lifecycle_over_http() {
    let state = state(Arc::new(Outbox::default()));
    let router = router(&state);

    let mut ids = Vec::new();
    for tenant in ["T1", "T2", "T3"] {
        let mut next = submission();
        next.tenant_id = tenant.to_string();
        ids.push(state.exit_requests.submit(next).await.expect("submits").request_id);
    }

    let admin = login(&router, "admin1", "adminpass").await;
    for (id, status) in [(&ids[0], "Approved"), (&ids[1], "Rejected")] {
        let response = call(
            &router,
            request(
                Method::PATCH,
                "/admin/update-exit-status",
                Some(json!({ "request_id": id, "new_status": status })),
                Some(&admin),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = call(
        &router,
        request(Method::GET, "/admin/dashboard-summary", None, Some(&admin)),
    )
    .await;
    assert_eq!(
        json(response).await,
        json!({ "total": 3, "approved": 1, "pending": 1, "rejected": 1 })
    );

    let tenant = login(&router, "tenant1", "tenantpass").await;
    let response = call(
        &router,
        request(Method::GET, "/admin/dashboard-summary", None, Some(&tenant)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json(response).await,
        json!({ "error": "access forbidden: admin only" })
    );
}

#[tokio::test]
async fn damage_reports_feed_the_landlord_timeline() {
    let state = state(Arc::new(Outbox::default()));
    let router = router(&state);

    state.exit_requests.submit(submission()).await.expect("submits");
    let response = call(
        &router,
        request(
            Method::POST,
            "/damage-report/submit",
            Some(json!({
                "tenant_id": "T1",
                "room_number": "101",
                "damaged_items": [{ "item": "Carpet", "price": "75.25" }],
                "estimated_cost": "75.25"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let landlord = login(&router, "landlord1", "landlordpass").await;
    let response = call(
        &router,
        request(Method::GET, "/landlord/move-timeline", None, Some(&landlord)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let timeline = json(response).await;
    let events = timeline.as_array().expect("events");
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .any(|event| event["description"]
            .as_str()
            .is_some_and(|text| text.contains("Carpet") && text.contains("75.25"))));
}
