pub mod router;
pub mod service;

pub use router::admin_routes;
pub use service::{AdminService, DashboardSummary, ExitRequestFilter};
