pub mod router;
pub mod service;

pub use router::{damage_report_routes, DamageReportPayload, NotifyQuery};
pub use service::{
    DamageReportForm, DamageReportReceipt, DamageReportService, DamageReportSubmission,
};
