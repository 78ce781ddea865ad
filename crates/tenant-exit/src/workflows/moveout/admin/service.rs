use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflows::moveout::domain::{
    DamageReport, ExitRequest, ExitRequestId, RequestStatus,
};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::exit_requests::{ExitReport, ExitRequestPatch, ExitRequestService};
use crate::workflows::moveout::store::{decode_all, RecordStore, Table};

/// Optional equality filters, AND-combined. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExitRequestFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
}

struct ParsedFilter {
    status: Option<RequestStatus>,
    tenant_id: Option<String>,
    room_number: Option<String>,
}

impl ExitRequestFilter {
    fn parse(self) -> Result<ParsedFilter, ServiceError> {
        let status = match present(self.status) {
            Some(value) => Some(value.parse::<RequestStatus>()?),
            None => None,
        };
        Ok(ParsedFilter {
            status,
            tenant_id: present(self.tenant_id),
            room_number: present(self.room_number),
        })
    }
}

impl ParsedFilter {
    fn matches(&self, record: &ExitRequest) -> bool {
        self.status.map_or(true, |status| record.request_status == status)
            && self
                .tenant_id
                .as_deref()
                .map_or(true, |tenant| record.tenant_id == tenant)
            && self
                .room_number
                .as_deref()
                .map_or(true, |room| record.room_number == room)
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Counts by status, recomputed from a full scan on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl DashboardSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ExitRequest>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut summary, record| {
                summary.total += 1;
                match record.request_status {
                    RequestStatus::Approved => summary.approved += 1,
                    RequestStatus::Pending => summary.pending += 1,
                    RequestStatus::Rejected => summary.rejected += 1,
                }
                summary
            })
    }
}

/// Cross-tenant reads and admin mutations.
pub struct AdminService {
    store: Arc<dyn RecordStore>,
    exit_requests: Arc<ExitRequestService>,
}

impl AdminService {
    pub fn new(store: Arc<dyn RecordStore>, exit_requests: Arc<ExitRequestService>) -> Self {
        Self {
            store,
            exit_requests,
        }
    }

    pub async fn all_exit_requests(&self) -> Result<Vec<ExitRequest>, ServiceError> {
        let items = self.store.scan(Table::ExitRequests).await?;
        Ok(decode_all(items)?)
    }

    pub async fn list_exit_requests(
        &self,
        filter: ExitRequestFilter,
    ) -> Result<Vec<ExitRequest>, ServiceError> {
        let filter = filter.parse()?;
        let records = self.all_exit_requests().await?;
        let scanned = records.len();
        let matched: Vec<ExitRequest> = records
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        debug!(scanned, matched = matched.len(), "filtered exit requests");
        Ok(matched)
    }

    pub async fn list_damage_reports(&self) -> Result<Vec<DamageReport>, ServiceError> {
        let items = self.store.scan(Table::DamageReports).await?;
        Ok(decode_all(items)?)
    }

    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let records = self.all_exit_requests().await?;
        Ok(DashboardSummary::from_records(&records))
    }

    pub async fn export_all(&self) -> Result<ExitReport, ServiceError> {
        let records = self.all_exit_requests().await?;
        ExitReport::for_all(&records)
    }

    pub async fn update_status(
        &self,
        request_id: &ExitRequestId,
        new_status: &str,
    ) -> Result<ExitRequest, ServiceError> {
        self.exit_requests.update_status(request_id, new_status).await
    }

    pub async fn update_fields(
        &self,
        request_id: &ExitRequestId,
        patch: ExitRequestPatch,
    ) -> Result<ExitRequest, ServiceError> {
        self.exit_requests.update_fields(request_id, patch).await
    }
}
