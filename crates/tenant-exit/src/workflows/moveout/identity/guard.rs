use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use tracing::warn;

use super::session::{SessionClaims, SessionManager};
use crate::workflows::moveout::domain::Role;
use crate::workflows::moveout::error::ServiceError;

/// Marker naming the role a route requires.
pub trait RoleRequirement: Send + Sync + 'static {
    const ROLE: Role;
}

#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

#[derive(Debug, Clone, Copy)]
pub struct LandlordOnly;

#[derive(Debug, Clone, Copy)]
pub struct TenantOnly;

impl RoleRequirement for AdminOnly {
    const ROLE: Role = Role::Admin;
}

impl RoleRequirement for LandlordOnly {
    const ROLE: Role = Role::Landlord;
}

impl RoleRequirement for TenantOnly {
    const ROLE: Role = Role::Tenant;
}

/// Checks session claims against a required role. Never mutates the session.
pub fn authorize(
    claims: Option<SessionClaims>,
    required: Role,
) -> Result<SessionClaims, ServiceError> {
    match claims {
        Some(claims) if claims.role == required => Ok(claims),
        _ => Err(ServiceError::Forbidden(required)),
    }
}

/// Extractor that admits only callers whose session role is `R::ROLE`.
#[derive(Debug, Clone)]
pub struct RequireRole<R> {
    pub claims: SessionClaims,
    _role: PhantomData<fn() -> R>,
}

#[axum::async_trait]
impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: Send + Sync,
    R: RoleRequirement,
    Arc<SessionManager>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionManager>::from_ref(state);
        let claims = sessions.claims_from_headers(&parts.headers).await;
        let caller = claims.as_ref().map(|claims| claims.role);
        match authorize(claims, R::ROLE) {
            Ok(claims) => Ok(Self {
                claims,
                _role: PhantomData,
            }),
            Err(err) => {
                warn!(
                    path = %parts.uri.path(),
                    required = %R::ROLE,
                    caller = ?caller,
                    "role guard rejected request"
                );
                Err(err)
            }
        }
    }
}
