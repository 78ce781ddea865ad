use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::FormRejection, Form, Multipart, State,
    },
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::collaborators::{folders, is_valid_email, BlobStore, EmailMessage, Notifier};
use super::domain::UploadedDocument;
use super::error::ServiceError;
use super::exit_requests::service::{required, upload};
use super::MoveOutState;

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub html_body: Option<String>,
}

pub fn upload_routes() -> Router<MoveOutState> {
    Router::new()
        .route("/upload/document", post(upload_document))
        .route("/notifications/email", post(send_email))
}

async fn upload_document(
    State(blobs): State<Arc<dyn BlobStore>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ServiceError> {
    let mut multipart = multipart?;
    let mut document = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("document").to_string();
            let bytes = field.bytes().await?;
            document = Some(UploadedDocument {
                filename,
                bytes: bytes.to_vec(),
            });
        }
    }

    let document = document.ok_or_else(|| ServiceError::invalid("file is required"))?;
    let filename = document.filename.clone();
    let file_url = upload(&*blobs, document, folders::TENANT_DOCUMENTS).await?;
    info!(filename = %filename, file_url = %file_url, "document uploaded");
    Ok(Json(json!({
        "message": "File uploaded successfully",
        "file_url": file_url,
    })))
}

async fn send_email(
    State(notifier): State<Arc<dyn Notifier>>,
    form: Result<Form<EmailForm>, FormRejection>,
) -> Result<Json<Value>, ServiceError> {
    let Form(form) = form?;
    let recipient = required("recipient", form.recipient)?;
    if !is_valid_email(&recipient) {
        return Err(ServiceError::invalid(format!(
            "recipient '{recipient}' is not a valid address"
        )));
    }
    let message = EmailMessage {
        subject: required("subject", form.subject)?,
        body: required("body", form.body)?,
        recipient: recipient.clone(),
        html_body: form.html_body.filter(|html| !html.trim().is_empty()),
    };

    notifier.send(message).await?;
    Ok(Json(json!({
        "message": format!("Email successfully sent to {recipient}"),
    })))
}
