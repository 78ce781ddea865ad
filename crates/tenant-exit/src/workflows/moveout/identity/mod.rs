//! Credentials, signed cookie sessions, and per-role route guards.

pub mod guard;
pub mod router;
pub mod service;
pub mod session;
pub mod users;

pub use guard::{authorize, AdminOnly, LandlordOnly, RequireRole, RoleRequirement, TenantOnly};
pub use router::{identity_routes, LoginRequest};
pub use service::IdentityService;
pub use session::{token_from_headers, SessionClaims, SessionManager, SESSION_COOKIE};
pub use users::{UserAccount, UserRegistry, UserRegistryError};
