use std::collections::HashMap;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;

use crate::workflows::moveout::domain::Role;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "tenant_exit_session";

/// Identity attributes held server side for a logged-in caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionClaims {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    claims: SessionClaims,
    expires_at: DateTime<Utc>,
}

/// Issues signed opaque tokens and maps them to server-side claims.
///
/// A token is `{id}.{hex(hmac(id))}`; only the id is used as the lookup key, and the
/// signature is checked before any lookup happens.
pub struct SessionManager {
    key: Vec<u8>,
    ttl: Duration,
    secure_cookie: bool,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            ttl,
            secure_cookie: false,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    /// Starts a session and returns the token to hand to the client. Sessions that have
    /// already expired are dropped on the way in.
    pub async fn create(&self, claims: SessionClaims) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let token = format!("{id}.{}", self.sign(&id));
        let now = Utc::now();
        let entry = SessionEntry {
            claims,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, existing| existing.expires_at > now);
        if sessions.len() < before {
            debug!(purged = before - sessions.len(), "dropped expired sessions");
        }
        sessions.insert(id, entry);
        token
    }

    /// Claims for `token`, or `None` when it is forged, unknown, or expired.
    pub async fn resolve(&self, token: &str) -> Option<SessionClaims> {
        let id = self.verify(token)?;
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(entry) if entry.expires_at > now => return Some(entry.claims.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        debug!("session expired");
        self.sessions.write().await.remove(id);
        None
    }

    /// Drops the session behind `token`. Unknown or forged tokens are ignored.
    pub async fn destroy(&self, token: &str) {
        if let Some(id) = self.verify(token) {
            self.sessions.write().await.remove(id);
        }
    }

    pub async fn claims_from_headers(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let token = token_from_headers(headers)?;
        self.resolve(&token).await
    }

    pub fn session_cookie(&self, token: &str) -> HeaderValue {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl.num_seconds()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| self.expired_cookie())
    }

    pub fn expired_cookie(&self) -> HeaderValue {
        let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).unwrap_or(HeaderValue::from_static(
            "tenant_exit_session=; Path=/; Max-Age=0",
        ))
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).ok()
    }

    fn sign(&self, id: &str) -> String {
        match self.mac() {
            Some(mut mac) => {
                mac.update(id.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            }
            None => String::new(),
        }
    }

    fn verify<'a>(&self, token: &'a str) -> Option<&'a str> {
        let (id, signature) = token.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac()?;
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id)
    }
}

/// Reads the session token from the `Cookie` request headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Response headers that set (or clear) the session cookie.
pub fn cookie_headers(value: HeaderValue) -> [(axum::http::HeaderName, HeaderValue); 1] {
    [(SET_COOKIE, value)]
}
