use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::workflows::moveout::collaborators::{
    folders, is_valid_email, BlobStore, EmailMessage, Notifier,
};
use crate::workflows::moveout::domain::{
    DamageReport, DamageReportId, DamagedItem, UploadedDocument,
};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::exit_requests::service::{required, upload};
use crate::workflows::moveout::store::{decode_all, encode, RecordStore, Table};

/// JSON payload describing a damage claim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageReportForm {
    pub tenant_id: String,
    pub room_number: String,
    #[serde(default)]
    pub damaged_items: Vec<DamagedItem>,
    #[serde(alias = "total_estimated")]
    pub estimated_cost: Decimal,
}

/// Everything needed to file a damage report.
#[derive(Debug, Clone)]
pub struct DamageReportSubmission {
    pub form: DamageReportForm,
    pub document: Option<UploadedDocument>,
    pub notify_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageReportReceipt {
    pub report_id: DamageReportId,
    /// `None` when no notification address was supplied.
    pub notification_sent: Option<bool>,
}

pub struct DamageReportService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
}

impl DamageReportService {
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

    pub async fn submit(
        &self,
        submission: DamageReportSubmission,
    ) -> Result<DamageReportReceipt, ServiceError> {
        let DamageReportSubmission {
            form,
            document,
            notify_email,
        } = submission;

        let tenant_id = required("tenant_id", form.tenant_id)?;
        let room_number = required("room_number", form.room_number)?;
        let damaged_items = validate_items(form.damaged_items)?;
        if form.estimated_cost < Decimal::ZERO {
            return Err(ServiceError::invalid("estimated_cost must not be negative"));
        }
        let notify_email = match notify_email.map(|email| email.trim().to_string()) {
            Some(email) if email.is_empty() => None,
            Some(email) if !is_valid_email(&email) => {
                return Err(ServiceError::invalid(format!(
                    "notify_email '{email}' is not a valid address"
                )))
            }
            other => other,
        };

        let report_id = DamageReportId::generate();
        let document_url = match document {
            Some(document) => Some(upload(&*self.blobs, document, folders::DAMAGE_DOCUMENTS).await?),
            None => None,
        };

        let record = DamageReport {
            report_id: report_id.clone(),
            tenant_id,
            room_number,
            damaged_items,
            estimated_cost: form.estimated_cost,
            document_url,
            reported_at: Utc::now(),
        };

        let itemized = record.itemized_total();
        if !record.damaged_items.is_empty() && itemized != record.estimated_cost {
            warn!(
                report_id = %record.report_id,
                itemized = %itemized,
                estimated_cost = %record.estimated_cost,
                "itemized damage total differs from estimated cost"
            );
        }

        self.store.put(Table::DamageReports, encode(&record)?).await?;
        info!(
            report_id = %record.report_id,
            tenant_id = %record.tenant_id,
            room_number = %record.room_number,
            "damage report submitted"
        );

        let notification_sent = match notify_email {
            Some(recipient) => Some(self.send_notification(&record, recipient).await),
            None => None,
        };
        Ok(DamageReportReceipt {
            report_id,
            notification_sent,
        })
    }

    /// Reports filed by `tenant_id`, oldest first.
    pub async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<DamageReport>, ServiceError> {
        let items = self
            .store
            .query_by_secondary_key(
                Table::DamageReports,
                Table::DamageReports.tenant_key(),
                tenant_id,
            )
            .await?;
        let mut reports: Vec<DamageReport> = decode_all(items)?;
        reports.sort_by_key(|report| report.reported_at);
        Ok(reports)
    }

    async fn send_notification(&self, record: &DamageReport, recipient: String) -> bool {
        let message = EmailMessage {
            subject: "Damage Report Submitted".to_string(),
            body: format!(
                "Dear Tenant,\n\nYour damage report has been submitted.\n\nReport ID: {}\nEstimated Amount: {}\n\nThank you.",
                record.report_id, record.estimated_cost
            ),
            recipient,
            html_body: None,
        };
        match self.notifier.send(message).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    report_id = %record.report_id,
                    error = %err,
                    "damage report stored but notification failed"
                );
                false
            }
        }
    }
}

fn validate_items(items: Vec<DamagedItem>) -> Result<Vec<DamagedItem>, ServiceError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let item = line.item.trim();
            if item.is_empty() {
                return Err(ServiceError::invalid(format!(
                    "damaged_items[{index}].item is required"
                )));
            }
            if line.price < Decimal::ZERO {
                return Err(ServiceError::invalid(format!(
                    "damaged_items[{index}].price must not be negative"
                )));
            }
            Ok(DamagedItem {
                item: item.to_string(),
                price: line.price,
            })
        })
        .collect()
}
