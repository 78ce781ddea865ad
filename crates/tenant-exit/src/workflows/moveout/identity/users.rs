use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::workflows::moveout::domain::Role;
use crate::workflows::moveout::error::ServiceError;

#[derive(Clone, Deserialize)]
pub struct UserAccount {
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Read-only credential registry keyed by username.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    accounts: HashMap<String, UserAccount>,
}

impl UserRegistry {
    pub fn new(accounts: HashMap<String, UserAccount>) -> Self {
        Self { accounts }
    }

    /// Sample accounts for local development, one per role.
    pub fn demo() -> Self {
        let accounts = [
            ("admin1", "adminpass", Role::Admin),
            ("tenant1", "tenantpass", Role::Tenant),
            ("landlord1", "landlordpass", Role::Landlord),
        ]
        .into_iter()
        .map(|(username, password, role)| {
            (
                username.to_string(),
                UserAccount {
                    password: password.to_string(),
                    role,
                },
            )
        })
        .collect();
        Self { accounts }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, UserRegistryError> {
        let accounts: HashMap<String, UserAccount> = serde_json::from_reader(reader)?;
        if accounts.is_empty() {
            return Err(UserRegistryError::Empty);
        }
        Ok(Self { accounts })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UserRegistryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Exact comparison; unknown user and wrong password are indistinguishable.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Role, ServiceError> {
        match self.accounts.get(username) {
            Some(account) if account.password == password => Ok(account.role),
            _ => Err(ServiceError::Unauthorized),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserRegistryError {
    #[error("unable to read user registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid user registry: {0}")]
    Format(#[from] serde_json::Error),
    #[error("user registry contains no accounts")]
    Empty,
}
