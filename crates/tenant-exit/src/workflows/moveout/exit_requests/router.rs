use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::report::{ExitReport, CSV_CONTENT_TYPE};
use super::service::{ExitRequestPatch, ExitRequestService, ExitRequestSubmission};
use crate::workflows::moveout::domain::{ExitRequest, ExitRequestId, UploadedDocument};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::MoveOutState;

/// Body of a status change, shared by the tenant-facing and admin routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub request_id: String,
    pub new_status: String,
}

/// Body of an admin field edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFieldsRequest {
    pub request_id: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub exit_reason: Option<String>,
    #[serde(default)]
    pub moveout_checklist: Option<Vec<String>>,
}

impl UpdateFieldsRequest {
    pub(crate) fn into_parts(self) -> (ExitRequestId, ExitRequestPatch) {
        let patch = ExitRequestPatch {
            admin_notes: self.admin_notes,
            exit_reason: self.exit_reason,
            moveout_checklist: self.moveout_checklist,
        };
        (ExitRequestId(self.request_id), patch)
    }
}

#[derive(Debug, Serialize)]
pub struct UpdatedExitRequest {
    pub message: String,
    pub request: ExitRequest,
}

impl UpdatedExitRequest {
    pub(crate) fn status_changed(request: ExitRequest) -> Self {
        Self {
            message: format!(
                "Request {} updated to '{}'.",
                request.request_id, request.request_status
            ),
            request,
        }
    }

    pub(crate) fn fields_changed(request: ExitRequest) -> Self {
        Self {
            message: format!("Request {} updated.", request.request_id),
            request,
        }
    }
}

pub fn exit_request_routes() -> Router<MoveOutState> {
    Router::new()
        .route("/exit-request/submit", post(submit_handler))
        .route("/exit-request/by-tenant/:tenant_id", get(list_handler))
        .route("/exit-request/report/:tenant_id", get(report_handler))
        .route("/exit-request/update-status", patch(update_status_handler))
}

async fn submit_handler(
    State(service): State<Arc<ExitRequestService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServiceError> {
    let submission = read_submission(multipart?).await?;
    let receipt = service.submit(submission).await?;
    let payload = json!({
        "message": "Exit request submitted successfully",
        "request_id": receipt.request_id,
        "confirmation_sent": receipt.confirmation_sent,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

async fn list_handler(
    State(service): State<Arc<ExitRequestService>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<ExitRequest>>, ServiceError> {
    Ok(Json(service.list_by_tenant(&tenant_id).await?))
}

async fn report_handler(
    State(service): State<Arc<ExitRequestService>>,
    Path(tenant_id): Path<String>,
) -> Result<Response, ServiceError> {
    let report = service.generate_report(&tenant_id).await?;
    Ok(csv_response(report))
}

async fn update_status_handler(
    State(service): State<Arc<ExitRequestService>>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UpdatedExitRequest>, ServiceError> {
    let Json(body) = body?;
    let request_id = ExitRequestId(body.request_id);
    let request = service.update_status(&request_id, &body.new_status).await?;
    Ok(Json(UpdatedExitRequest::status_changed(request)))
}

pub(crate) fn csv_response(report: ExitReport) -> Response {
    let disposition = report.content_disposition();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.body,
    )
        .into_response()
}

async fn read_submission(mut multipart: Multipart) -> Result<ExitRequestSubmission, ServiceError> {
    let mut submission = ExitRequestSubmission::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "tenant_id" => submission.tenant_id = field.text().await?,
            "name" => submission.name = field.text().await?,
            "room_number" => submission.room_number = field.text().await?,
            "exit_reason" => submission.exit_reason = field.text().await?,
            "email" => submission.email = field.text().await?,
            "moveout_checklist" => submission.moveout_checklist.push(field.text().await?),
            "supporting_document" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    submission.supporting_document = Some(UploadedDocument {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => debug!(field = other, "ignoring unexpected multipart field"),
        }
    }
    Ok(submission)
}
