//! Tenant move-out workflow: exit requests, damage reports, admin aggregation, and
//! role-scoped views behind cookie sessions.
//!
//! Persistence, document storage, and e-mail delivery are collaborators injected as trait
//! objects, so the same services run against the in-memory store in tests and the demo.

pub mod admin;
pub mod collaborators;
pub mod damage_reports;
pub mod domain;
pub mod error;
pub mod exit_requests;
pub mod identity;
pub mod memory;
pub mod store;
pub mod uploads;
pub mod views;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::Router;

pub use admin::{AdminService, DashboardSummary, ExitRequestFilter};
pub use collaborators::{BlobError, BlobStore, EmailMessage, Notifier, NotifyError};
pub use damage_reports::{
    DamageReportForm, DamageReportReceipt, DamageReportService, DamageReportSubmission,
};
pub use domain::{
    DamageReport, DamageReportId, DamagedItem, ExitRequest, ExitRequestId, RequestStatus, Role,
    UploadedDocument,
};
pub use error::ServiceError;
pub use exit_requests::{
    ExitReport, ExitRequestPatch, ExitRequestReceipt, ExitRequestService, ExitRequestSubmission,
};
pub use identity::{
    IdentityService, RequireRole, SessionClaims, SessionManager, UserRegistry, UserRegistryError,
};
pub use memory::InMemoryRecordStore;
pub use store::{RecordStore, StoreError, Table};
pub use views::MoveOutViews;

/// Shared handler state. Each handler extracts only the service it needs.
#[derive(Clone)]
pub struct MoveOutState {
    pub exit_requests: Arc<ExitRequestService>,
    pub damage_reports: Arc<DamageReportService>,
    pub admin: Arc<AdminService>,
    pub views: Arc<MoveOutViews>,
    pub identity: Arc<IdentityService>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl MoveOutState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
        users: UserRegistry,
        sessions: Arc<SessionManager>,
    ) -> Self {
        let exit_requests = Arc::new(ExitRequestService::new(
            store.clone(),
            blobs.clone(),
            notifier.clone(),
        ));
        let damage_reports = Arc::new(DamageReportService::new(
            store.clone(),
            blobs.clone(),
            notifier.clone(),
        ));
        let admin = Arc::new(AdminService::new(store.clone(), exit_requests.clone()));
        let views = Arc::new(MoveOutViews::new(store));
        let identity = Arc::new(IdentityService::new(users, sessions));

        Self {
            exit_requests,
            damage_reports,
            admin,
            views,
            identity,
            blobs,
            notifier,
        }
    }
}

impl FromRef<MoveOutState> for Arc<ExitRequestService> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.exit_requests.clone()
    }
}

impl FromRef<MoveOutState> for Arc<DamageReportService> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.damage_reports.clone()
    }
}

impl FromRef<MoveOutState> for Arc<AdminService> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.admin.clone()
    }
}

impl FromRef<MoveOutState> for Arc<MoveOutViews> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.views.clone()
    }
}

impl FromRef<MoveOutState> for Arc<IdentityService> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.identity.clone()
    }
}

impl FromRef<MoveOutState> for Arc<SessionManager> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.identity.sessions().clone()
    }
}

impl FromRef<MoveOutState> for Arc<dyn BlobStore> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.blobs.clone()
    }
}

impl FromRef<MoveOutState> for Arc<dyn Notifier> {
    fn from_ref(state: &MoveOutState) -> Self {
        state.notifier.clone()
    }
}

/// Every move-out route, with state applied.
pub fn moveout_router(state: MoveOutState) -> Router {
    Router::new()
        .merge(exit_requests::exit_request_routes())
        .merge(damage_reports::damage_report_routes())
        .merge(admin::admin_routes())
        .merge(views::landlord_routes())
        .merge(views::tenant_routes())
        .merge(identity::identity_routes())
        .merge(uploads::upload_routes())
        .with_state(state)
}
