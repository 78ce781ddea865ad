use serde::Serialize;

use crate::workflows::moveout::domain::ExitRequest;
use crate::workflows::moveout::error::ServiceError;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

const HEADER: [&str; 11] = [
    "request_id",
    "tenant_id",
    "name",
    "room_number",
    "email",
    "exit_reason",
    "moveout_checklist",
    "supporting_document_url",
    "request_status",
    "admin_notes",
    "submitted_at",
];

/// Delimited export of exit requests, ready to be served as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub filename: String,
    pub body: Vec<u8>,
}

impl ExitReport {
    pub fn for_tenant(tenant_id: &str, records: &[ExitRequest]) -> Result<Self, ServiceError> {
        Ok(Self {
            filename: format!("exit_report_{}.csv", filename_safe(tenant_id)),
            body: render_csv(records)?,
        })
    }

    pub fn for_all(records: &[ExitRequest]) -> Result<Self, ServiceError> {
        Ok(Self {
            filename: "exit_report_all.csv".to_string(),
            body: render_csv(records)?,
        })
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Drops characters that could end or extend a quoted header parameter.
fn filename_safe(tenant_id: &str) -> String {
    tenant_id
        .chars()
        .filter(|c| {
            c.is_ascii() && !c.is_ascii_control() && !matches!(c, '"' | ';' | '\\' | '/')
        })
        .collect()
}

#[derive(Serialize)]
struct ExitReportRow<'a> {
    request_id: &'a str,
    tenant_id: &'a str,
    name: &'a str,
    room_number: &'a str,
    email: &'a str,
    exit_reason: &'a str,
    moveout_checklist: String,
    supporting_document_url: Option<&'a str>,
    request_status: &'static str,
    admin_notes: Option<&'a str>,
    submitted_at: String,
}

impl<'a> From<&'a ExitRequest> for ExitReportRow<'a> {
    fn from(record: &'a ExitRequest) -> Self {
        Self {
            request_id: &record.request_id.0,
            tenant_id: &record.tenant_id,
            name: &record.name,
            room_number: &record.room_number,
            email: &record.email,
            exit_reason: &record.exit_reason,
            moveout_checklist: record.moveout_checklist.join("; "),
            supporting_document_url: record.supporting_document_url.as_deref(),
            request_status: record.request_status.as_str(),
            admin_notes: record.admin_notes.as_deref(),
            submitted_at: record.submitted_at.to_rfc3339(),
        }
    }
}

pub(crate) fn render_csv(records: &[ExitRequest]) -> Result<Vec<u8>, ServiceError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|err| ServiceError::Report(err.to_string()))?;
    for record in records {
        writer
            .serialize(ExitReportRow::from(record))
            .map_err(|err| ServiceError::Report(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| ServiceError::Report(err.error().to_string()))
}
