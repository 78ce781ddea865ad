use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for exit requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitRequestId(pub String);

impl ExitRequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ExitRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for damage reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageReportId(pub String);

impl DamageReportId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for DamageReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review state of an exit request. Any state may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status value '{0}'; expected one of Pending, Approved, Rejected")]
pub struct UnknownStatus(pub String);

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Stored move-out submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRequest {
    pub request_id: ExitRequestId,
    pub tenant_id: String,
    pub name: String,
    pub room_number: String,
    pub email: String,
    pub exit_reason: String,
    #[serde(default)]
    pub moveout_checklist: Vec<String>,
    #[serde(default)]
    pub supporting_document_url: Option<String>,
    pub request_status: RequestStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// One itemized line of a damage claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamagedItem {
    pub item: String,
    pub price: Decimal,
}

/// Stored damage claim with its estimated remediation cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub report_id: DamageReportId,
    pub tenant_id: String,
    pub room_number: String,
    #[serde(default)]
    pub damaged_items: Vec<DamagedItem>,
    pub estimated_cost: Decimal,
    #[serde(default)]
    pub document_url: Option<String>,
    pub reported_at: DateTime<Utc>,
}

impl DamageReport {
    /// Sum of the itemized prices. Not required to match `estimated_cost`.
    pub fn itemized_total(&self) -> Decimal {
        self.damaged_items.iter().map(|line| line.price).sum()
    }
}

/// File received from a client, not yet handed to the blob store.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Caller role carried in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Landlord,
    Tenant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Landlord => "landlord",
            Self::Tenant => "tenant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_exact() {
        assert_eq!("Approved".parse::<RequestStatus>(), Ok(RequestStatus::Approved));
        assert!("approved".parse::<RequestStatus>().is_err());
        assert!(" Pending".parse::<RequestStatus>().is_err());
        assert_eq!(
            "Bogus".parse::<RequestStatus>(),
            Err(UnknownStatus("Bogus".to_string()))
        );
    }

    #[test]
    fn status_serializes_as_variant_name() {
        let value = serde_json::to_value(RequestStatus::Rejected).expect("serializes");
        assert_eq!(value, serde_json::json!("Rejected"));
    }

    #[test]
    fn itemized_total_is_exact() {
        let report = DamageReport {
            report_id: DamageReportId("r-1".to_string()),
            tenant_id: "T1".to_string(),
            room_number: "101".to_string(),
            damaged_items: vec![
                DamagedItem {
                    item: "Window".to_string(),
                    price: Decimal::new(10, 1),
                },
                DamagedItem {
                    item: "Door".to_string(),
                    price: Decimal::new(20, 1),
                },
            ],
            estimated_cost: Decimal::new(30, 1),
            document_url: None,
            reported_at: Utc::now(),
        };
        assert_eq!(report.itemized_total(), report.estimated_cost);
    }

    #[test]
    fn roles_use_lowercase_wire_names() {
        let role: Role = serde_json::from_str("\"landlord\"").expect("parses");
        assert_eq!(role, Role::Landlord);
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
