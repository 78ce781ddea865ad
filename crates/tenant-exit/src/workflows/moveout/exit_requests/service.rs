use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::report::ExitReport;
use crate::workflows::moveout::collaborators::{
    folders, is_valid_email, BlobStore, EmailMessage, Notifier,
};
use crate::workflows::moveout::domain::{
    ExitRequest, ExitRequestId, RequestStatus, UploadedDocument,
};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::store::{
    decode, decode_all, encode, FieldUpdate, RecordStore, StoreError, Table, UpdatableField,
};

/// Tenant-supplied data for a new exit request.
#[derive(Debug, Clone, Default)]
pub struct ExitRequestSubmission {
    pub tenant_id: String,
    pub name: String,
    pub room_number: String,
    pub exit_reason: String,
    pub email: String,
    pub moveout_checklist: Vec<String>,
    pub supporting_document: Option<UploadedDocument>,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequestReceipt {
    pub request_id: ExitRequestId,
    pub confirmation_sent: bool,
}

/// Attributes of an exit request that may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequestField {
    RequestStatus,
    AdminNotes,
    ExitReason,
    MoveoutChecklist,
}

impl UpdatableField for ExitRequestField {
    fn attribute(self) -> &'static str {
        match self {
            Self::RequestStatus => "request_status",
            Self::AdminNotes => "admin_notes",
            Self::ExitReason => "exit_reason",
            Self::MoveoutChecklist => "moveout_checklist",
        }
    }
}

/// Admin edit of an exit request. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExitRequestPatch {
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub exit_reason: Option<String>,
    #[serde(default)]
    pub moveout_checklist: Option<Vec<String>>,
}

impl ExitRequestPatch {
    pub fn is_empty(&self) -> bool {
        self.admin_notes.is_none() && self.exit_reason.is_none() && self.moveout_checklist.is_none()
    }

    fn into_update(self) -> Result<FieldUpdate, ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::invalid("no update fields provided"));
        }

        let mut update = FieldUpdate::new();
        if let Some(notes) = self.admin_notes {
            update = update.set(ExitRequestField::AdminNotes, json!(notes));
        }
        if let Some(reason) = self.exit_reason {
            let reason = required("exit_reason", reason)?;
            update = update.set(ExitRequestField::ExitReason, json!(reason));
        }
        if let Some(checklist) = self.moveout_checklist {
            update = update.set(
                ExitRequestField::MoveoutChecklist,
                json!(clean_checklist(checklist)),
            );
        }
        Ok(update)
    }
}

/// Validates, stores, and edits exit requests.
pub struct ExitRequestService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
}

impl ExitRequestService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            blobs,
            notifier,
        }
    }

    /// Submit a new exit request. The document upload happens before anything is
    /// persisted; the confirmation e-mail happens after.
    pub async fn submit(
        &self,
        submission: ExitRequestSubmission,
    ) -> Result<ExitRequestReceipt, ServiceError> {
        let ExitRequestSubmission {
            tenant_id,
            name,
            room_number,
            exit_reason,
            email,
            moveout_checklist,
            supporting_document,
        } = submission;

        let tenant_id = required("tenant_id", tenant_id)?;
        let name = required("name", name)?;
        let room_number = required("room_number", room_number)?;
        let exit_reason = required("exit_reason", exit_reason)?;
        let email = required("email", email)?;
        if !is_valid_email(&email) {
            return Err(ServiceError::invalid(format!(
                "email '{email}' is not a valid address"
            )));
        }

        let request_id = ExitRequestId::generate();
        let supporting_document_url = match supporting_document {
            Some(document) => Some(upload(&*self.blobs, document, folders::EXIT_DOCUMENTS).await?),
            None => None,
        };

        let record = ExitRequest {
            request_id: request_id.clone(),
            tenant_id,
            name,
            room_number,
            email,
            exit_reason,
            moveout_checklist: clean_checklist(moveout_checklist),
            supporting_document_url,
            request_status: RequestStatus::Pending,
            admin_notes: None,
            submitted_at: Utc::now(),
        };
        self.store.put(Table::ExitRequests, encode(&record)?).await?;
        info!(
            request_id = %record.request_id,
            tenant_id = %record.tenant_id,
            room_number = %record.room_number,
            "exit request submitted"
        );

        let confirmation_sent = self.send_confirmation(&record).await;
        Ok(ExitRequestReceipt {
            request_id,
            confirmation_sent,
        })
    }

    /// All requests filed by `tenant_id`, oldest first. Empty when there are none.
    pub async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<ExitRequest>, ServiceError> {
        let items = self
            .store
            .query_by_secondary_key(Table::ExitRequests, Table::ExitRequests.tenant_key(), tenant_id)
            .await?;
        let mut records: Vec<ExitRequest> = decode_all(items)?;
        records.sort_by_key(|record| record.submitted_at);
        Ok(records)
    }

    /// Overwrites the status regardless of its current value.
    pub async fn update_status(
        &self,
        request_id: &ExitRequestId,
        new_status: &str,
    ) -> Result<ExitRequest, ServiceError> {
        let status: RequestStatus = new_status.parse()?;
        let update = FieldUpdate::new().set(ExitRequestField::RequestStatus, json!(status));
        let record = self.apply(request_id, update).await?;
        info!(request_id = %request_id, status = %status, "exit request status updated");
        Ok(record)
    }

    /// Applies the supplied subset of admin-editable fields.
    pub async fn update_fields(
        &self,
        request_id: &ExitRequestId,
        patch: ExitRequestPatch,
    ) -> Result<ExitRequest, ServiceError> {
        let update = patch.into_update()?;
        let fields: Vec<&str> = update.attributes().collect();
        let record = self.apply(request_id, update).await?;
        info!(request_id = %request_id, ?fields, "exit request fields updated");
        Ok(record)
    }

    /// CSV export of every request filed by `tenant_id`.
    pub async fn generate_report(&self, tenant_id: &str) -> Result<ExitReport, ServiceError> {
        let records = self.list_by_tenant(tenant_id).await?;
        if records.is_empty() {
            return Err(ServiceError::NotFound("No exit records found.".to_string()));
        }
        ExitReport::for_tenant(tenant_id, &records)
    }

    async fn apply(
        &self,
        request_id: &ExitRequestId,
        update: FieldUpdate,
    ) -> Result<ExitRequest, ServiceError> {
        let item = self
            .store
            .update(Table::ExitRequests, &request_id.0, update)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => {
                    ServiceError::NotFound(format!("exit request {request_id} not found"))
                }
                other => ServiceError::Store(other),
            })?;
        Ok(decode(item)?)
    }

    async fn send_confirmation(&self, record: &ExitRequest) -> bool {
        let message = EmailMessage {
            subject: "Exit Request Submitted".to_string(),
            body: format!(
                "Hi {},\n\nYour exit request has been submitted successfully.\nRequest ID: {}",
                record.name, record.request_id
            ),
            recipient: record.email.clone(),
            html_body: None,
        };

        match self.notifier.send(message).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    request_id = %record.request_id,
                    error = %err,
                    "exit request stored but confirmation email failed"
                );
                false
            }
        }
    }
}

pub(crate) fn required(field: &str, value: String) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ServiceError::invalid(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) async fn upload(
    blobs: &dyn BlobStore,
    document: UploadedDocument,
    folder: &str,
) -> Result<String, ServiceError> {
    if document.bytes.is_empty() {
        return Err(ServiceError::invalid(format!(
            "uploaded file '{}' is empty",
            document.filename
        )));
    }
    let url = blobs
        .store(document.bytes, &document.filename, folder)
        .await?;
    Ok(url)
}

fn clean_checklist(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
