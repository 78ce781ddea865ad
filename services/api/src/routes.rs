use crate::infra::AppState;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::path::Path;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

/// Liveness, readiness, metrics, and the stored-document file tree under `/files`.
pub(crate) fn ops_routes(blob_root: &Path) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .nest_service("/files", ServeDir::new(blob_root))
}

/// Browser access for the configured front-end origins, cookies included.
pub(crate) fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub(crate) async fn banner() -> Json<serde_json::Value> {
    Json(json!({ "message": "Tenant exit backend is running" }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::LocalBlobStore;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tenant_exit::workflows::moveout::BlobStore;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    async fn fetch(
        app: Router,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, headers, bytes.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn readiness_flips_once_flag_is_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state();
        let app = ops_routes(dir.path()).layer(Extension(state.clone()));

        let (status, _, _) = fetch(app.clone(), get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let (status, _, body) = fetch(app.clone(), get("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(body, json!({ "status": "ready" }));

        let (status, _, _) = fetch(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn stored_uploads_are_served_back_at_their_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = LocalBlobStore::new(dir.path(), "http://files.test/files");
        let url = blobs
            .store(b"%PDF-1.4".to_vec(), "lease.pdf", "exit_docs")
            .await
            .expect("stores");
        let path = url.strip_prefix("http://files.test").expect("public url");
        let app = ops_routes(dir.path()).layer(Extension(state()));

        let (status, headers, body) = fetch(app.clone(), get(path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"%PDF-1.4");
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");

        let (status, _, _) = fetch(app, get("/files/exit_docs/missing.pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn file_tree_does_not_escape_the_blob_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("blobs");
        std::fs::create_dir_all(&root).expect("blob root");
        std::fs::write(dir.path().join("secret.txt"), b"secret").expect("write");
        let app = ops_routes(&root).layer(Extension(state()));

        for uri in ["/files/../secret.txt", "/files/%2e%2e/secret.txt"] {
            let (status, _, body) = fetch(app.clone(), get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_ne!(body, b"secret");
        }
    }

    #[tokio::test]
    async fn cors_admits_configured_origins_with_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = ops_routes(dir.path())
            .layer(Extension(state()))
            .layer(cors_layer(vec![HeaderValue::from_static(
                "http://127.0.0.1:5500",
            )]));

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/health")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .expect("request")
        };

        let (_, headers, _) = fetch(app.clone(), preflight("http://127.0.0.1:5500")).await;
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://127.0.0.1:5500"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let (_, headers, _) = fetch(app, preflight("http://evil.example")).await;
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
