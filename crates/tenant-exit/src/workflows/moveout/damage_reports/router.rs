use std::sync::Arc;

use axum::{
    extract::{
        rejection::QueryRejection, FromRequest, Multipart, Path, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::service::{DamageReportForm, DamageReportService, DamageReportSubmission};
use crate::workflows::moveout::domain::{DamageReport, UploadedDocument};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::MoveOutState;

#[derive(Debug, Default, Deserialize)]
pub struct NotifyQuery {
    #[serde(default)]
    pub notify_email: Option<String>,
}

/// Damage report body, sent either as JSON or as multipart with a `report` JSON part.
#[derive(Debug)]
pub struct DamageReportPayload(pub DamageReportSubmission);

#[axum::async_trait]
impl<S> FromRequest<S> for DamageReportPayload
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            read_multipart(multipart).await.map(Self)
        } else {
            let Json(form) = Json::<DamageReportForm>::from_request(req, state).await?;
            Ok(Self(DamageReportSubmission {
                form,
                document: None,
                notify_email: None,
            }))
        }
    }
}

pub fn damage_report_routes() -> Router<MoveOutState> {
    Router::new()
        .route("/damage-report/submit", post(submit_handler))
        .route("/damage-report/list/:tenant_id", get(list_handler))
}

async fn submit_handler(
    State(service): State<Arc<DamageReportService>>,
    query: Result<Query<NotifyQuery>, QueryRejection>,
    DamageReportPayload(mut submission): DamageReportPayload,
) -> Result<Response, ServiceError> {
    let Query(query) = query?;
    if submission.notify_email.is_none() {
        submission.notify_email = query.notify_email;
    }

    let receipt = service.submit(submission).await?;
    let payload = json!({
        "message": "Damage report submitted successfully",
        "report_id": receipt.report_id,
        "notification_sent": receipt.notification_sent,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

async fn list_handler(
    State(service): State<Arc<DamageReportService>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<DamageReport>>, ServiceError> {
    Ok(Json(service.list_by_tenant(&tenant_id).await?))
}

async fn read_multipart(mut multipart: Multipart) -> Result<DamageReportSubmission, ServiceError> {
    let mut form: Option<DamageReportForm> = None;
    let mut document = None;
    let mut notify_email = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "report" => {
                let text = field.text().await?;
                let parsed = serde_json::from_str(&text).map_err(|err| {
                    ServiceError::invalid(format!("report part is not valid JSON: {err}"))
                })?;
                form = Some(parsed);
            }
            "document" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    document = Some(UploadedDocument {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "notify_email" => notify_email = Some(field.text().await?),
            other => debug!(field = other, "ignoring unexpected multipart field"),
        }
    }

    let form = form.ok_or_else(|| ServiceError::invalid("multipart body is missing the report part"))?;
    Ok(DamageReportSubmission {
        form,
        document,
        notify_email,
    })
}
