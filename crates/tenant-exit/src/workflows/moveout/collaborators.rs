use async_trait::async_trait;
use validator::ValidateEmail;

/// Folder namespaces used when handing uploads to the blob store.
pub mod folders {
    pub const EXIT_DOCUMENTS: &str = "exit_docs";
    pub const DAMAGE_DOCUMENTS: &str = "damage_docs";
    pub const TENANT_DOCUMENTS: &str = "tenant_docs";
}

/// Object storage for uploaded documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under a fresh key inside `folder` and returns its public URL.
    async fn store(&self, bytes: Vec<u8>, filename: &str, folder: &str)
        -> Result<String, BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob folder '{0}'")]
    InvalidFolder(String),
    #[error("blob upload failed: {0}")]
    Upload(String),
}

/// Builds the object key `{folder}/{id}.{ext}` from the client-supplied file name.
pub fn object_key(folder: &str, id: &str, filename: &str) -> Result<String, BlobError> {
    let valid_folder = !folder.is_empty()
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_folder {
        return Err(BlobError::InvalidFolder(folder.to_string()));
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .take(16)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty());

    Ok(match extension {
        Some(ext) => format!("{folder}/{id}.{ext}"),
        None => format!("{folder}/{id}"),
    })
}

/// Single-recipient e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub recipient: String,
    pub html_body: Option<String>,
}

/// Outbound e-mail transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
    #[error("email rejected for {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },
}

/// Address check for outbound mail: RFC-shaped per `validator`, with a dotted domain.
pub fn is_valid_email(value: &str) -> bool {
    value.validate_email()
        && value
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}
