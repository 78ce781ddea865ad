//! Role-scoped read projections for landlords and tenants.

pub mod projections;
pub mod router;

use std::sync::Arc;

pub use projections::{ApprovedExitView, RoomHistoryEntry, TenantExitView, TimelineEvent};
pub use router::{landlord_routes, tenant_routes};

use crate::workflows::moveout::domain::{DamageReport, ExitRequest};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::store::{decode_all, RecordStore, Table};

pub struct MoveOutViews {
    store: Arc<dyn RecordStore>,
}

impl MoveOutViews {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn approved_exits(&self) -> Result<Vec<ApprovedExitView>, ServiceError> {
        Ok(projections::approved_exits(&self.exit_requests().await?))
    }

    pub async fn room_history(&self) -> Result<Vec<RoomHistoryEntry>, ServiceError> {
        Ok(projections::room_history(&self.exit_requests().await?))
    }

    pub async fn move_timeline(&self) -> Result<Vec<TimelineEvent>, ServiceError> {
        let requests = self.exit_requests().await?;
        let reports: Vec<DamageReport> =
            decode_all(self.store.scan(Table::DamageReports).await?)?;
        Ok(projections::move_timeline(&requests, &reports))
    }

    /// Exit requests filed by `tenant_id`, oldest first.
    pub async fn tenant_exit_requests(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<TenantExitView>, ServiceError> {
        let items = self
            .store
            .query_by_secondary_key(
                Table::ExitRequests,
                Table::ExitRequests.tenant_key(),
                tenant_id,
            )
            .await?;
        let mut records: Vec<ExitRequest> = decode_all(items)?;
        records.sort_by_key(|record| record.submitted_at);
        Ok(records.into_iter().map(projections::tenant_exit_view).collect())
    }

    async fn exit_requests(&self) -> Result<Vec<ExitRequest>, ServiceError> {
        Ok(decode_all(self.store.scan(Table::ExitRequests).await?)?)
    }
}
