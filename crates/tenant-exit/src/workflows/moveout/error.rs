use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::collaborators::{BlobError, NotifyError};
use super::domain::{Role, UnknownStatus};
use super::store::StoreError;

/// Error raised by the move-out services, mapped to a status code at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("access forbidden: {0} only")]
    Forbidden(Role),
    #[error("invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("report export failed: {0}")]
    Report(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Blob(_) | Self::Notify(_) | Self::Report(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "collaborator failure");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<UnknownStatus> for ServiceError {
    fn from(value: UnknownStatus) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(value: JsonRejection) -> Self {
        Self::InvalidInput(value.body_text())
    }
}

impl From<FormRejection> for ServiceError {
    fn from(value: FormRejection) -> Self {
        Self::InvalidInput(value.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(value: QueryRejection) -> Self {
        Self::InvalidInput(value.body_text())
    }
}

impl From<MultipartError> for ServiceError {
    fn from(value: MultipartError) -> Self {
        Self::InvalidInput(format!("malformed multipart body: {}", value.body_text()))
    }
}

impl From<MultipartRejection> for ServiceError {
    fn from(value: MultipartRejection) -> Self {
        Self::InvalidInput(value.body_text())
    }
}
