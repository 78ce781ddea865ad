//! Tenant exit requests: submission, per-tenant listing, status changes, and CSV export.

pub mod report;
pub mod router;
pub mod service;

pub use report::{ExitReport, CSV_CONTENT_TYPE};
pub use router::{exit_request_routes, UpdateFieldsRequest, UpdateStatusRequest, UpdatedExitRequest};
pub use service::{
    ExitRequestField, ExitRequestPatch, ExitRequestReceipt, ExitRequestService,
    ExitRequestSubmission,
};
