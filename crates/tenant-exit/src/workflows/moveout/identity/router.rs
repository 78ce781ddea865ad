use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::IdentityService;
use super::session::{cookie_headers, token_from_headers, SessionClaims, SessionManager};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::MoveOutState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub fn identity_routes() -> Router<MoveOutState> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/session", get(session_handler))
}

async fn login_handler(
    State(identity): State<Arc<IdentityService>>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(credentials) = body?;
    let (claims, token) = identity
        .login(&credentials.username, &credentials.password)
        .await?;

    // A fresh login replaces whatever session the client carried before.
    let previous = token_from_headers(&headers);
    identity.logout(previous.as_deref()).await;

    let cookie = identity.sessions().session_cookie(&token);
    let payload = json!({
        "message": "Login successful",
        "role": claims.role,
    });
    Ok((cookie_headers(cookie), Json(payload)).into_response())
}

async fn logout_handler(
    State(identity): State<Arc<IdentityService>>,
    headers: HeaderMap,
) -> Response {
    let token = token_from_headers(&headers);
    identity.logout(token.as_deref()).await;
    let cookie = identity.sessions().expired_cookie();
    (
        cookie_headers(cookie),
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}

async fn session_handler(
    State(sessions): State<Arc<SessionManager>>,
    headers: HeaderMap,
) -> Result<Json<SessionClaims>, ServiceError> {
    sessions
        .claims_from_headers(&headers)
        .await
        .map(Json)
        .ok_or(ServiceError::Unauthorized)
}
