use std::sync::Arc;

use tracing::{info, warn};

use super::session::{SessionClaims, SessionManager};
use super::users::UserRegistry;
use crate::workflows::moveout::error::ServiceError;

/// Login and logout over an injected, read-only user registry.
#[derive(Debug)]
pub struct IdentityService {
    users: UserRegistry,
    sessions: Arc<SessionManager>,
}

impl IdentityService {
    pub fn new(users: UserRegistry, sessions: Arc<SessionManager>) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Verifies credentials and opens a session, returning its claims and token.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(SessionClaims, String), ServiceError> {
        let username = username.trim();
        let role = match self.users.authenticate(username, password.trim()) {
            Ok(role) => role,
            Err(err) => {
                warn!(username, "login rejected");
                return Err(err);
            }
        };

        let claims = SessionClaims {
            username: username.to_string(),
            role,
        };
        let token = self.sessions.create(claims.clone()).await;
        info!(username, role = %role, "login succeeded");
        Ok((claims, token))
    }

    /// Ends the session behind `token`, if any.
    pub async fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            self.sessions.destroy(token).await;
        }
    }
}
