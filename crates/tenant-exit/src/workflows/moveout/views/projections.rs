use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflows::moveout::domain::{
    DamageReport, ExitRequest, ExitRequestId, RequestStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovedExitView {
    pub request_id: ExitRequestId,
    pub tenant_id: String,
    pub name: String,
    pub room_number: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomHistoryEntry {
    pub room_number: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub request_status: RequestStatus,
    pub exit_requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub date: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantExitView {
    pub request_id: ExitRequestId,
    pub tenant_id: String,
    pub name: String,
    pub room_number: String,
    pub exit_reason: String,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
    pub document_url: Option<String>,
}

pub fn approved_exits(records: &[ExitRequest]) -> Vec<ApprovedExitView> {
    let mut views: Vec<ApprovedExitView> = records
        .iter()
        .filter(|record| record.request_status == RequestStatus::Approved)
        .map(|record| ApprovedExitView {
            request_id: record.request_id.clone(),
            tenant_id: record.tenant_id.clone(),
            name: record.name.clone(),
            room_number: record.room_number.clone(),
            submitted_at: record.submitted_at,
        })
        .collect();
    views.sort_by_key(|view| view.submitted_at);
    views
}

pub fn room_history(records: &[ExitRequest]) -> Vec<RoomHistoryEntry> {
    let mut entries: Vec<RoomHistoryEntry> = records
        .iter()
        .map(|record| RoomHistoryEntry {
            room_number: record.room_number.clone(),
            tenant_id: record.tenant_id.clone(),
            tenant_name: record.name.clone(),
            request_status: record.request_status,
            exit_requested_at: record.submitted_at,
        })
        .collect();
    entries.sort_by(|a, b| {
        a.room_number
            .cmp(&b.room_number)
            .then(a.exit_requested_at.cmp(&b.exit_requested_at))
    });
    entries
}

pub fn move_timeline(requests: &[ExitRequest], reports: &[DamageReport]) -> Vec<TimelineEvent> {
    let exits = requests.iter().map(|record| TimelineEvent {
        date: record.submitted_at,
        description: format!(
            "{} requested to move out of room {} ({})",
            record.name,
            record.room_number,
            record.request_status.label()
        ),
    });
    let damages = reports.iter().map(|report| TimelineEvent {
        date: report.reported_at,
        description: damage_description(report),
    });

    let mut events: Vec<TimelineEvent> = exits.chain(damages).collect();
    events.sort_by_key(|event| event.date);
    events
}

fn damage_description(report: &DamageReport) -> String {
    let items = if report.damaged_items.is_empty() {
        "no itemized damage".to_string()
    } else {
        report
            .damaged_items
            .iter()
            .map(|line| line.item.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Damage reported in room {} by {}: {} (estimated {})",
        report.room_number, report.tenant_id, items, report.estimated_cost
    )
}

pub fn tenant_exit_view(record: ExitRequest) -> TenantExitView {
    TenantExitView {
        request_id: record.request_id,
        tenant_id: record.tenant_id,
        name: record.name,
        room_number: record.room_number,
        exit_reason: record.exit_reason,
        status: record.request_status.label(),
        submitted_at: record.submitted_at,
        document_url: record.supporting_document_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::moveout::domain::{DamageReportId, DamagedItem};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn request(room: &str, name: &str, status: RequestStatus, day: u32) -> ExitRequest {
        ExitRequest {
            request_id: ExitRequestId(format!("req-{room}-{day}")),
            tenant_id: format!("T-{name}"),
            name: name.to_string(),
            room_number: room.to_string(),
            email: "t@example.com".to_string(),
            exit_reason: "relocation".to_string(),
            moveout_checklist: Vec::new(),
            supporting_document_url: None,
            request_status: status,
            admin_notes: None,
            submitted_at: at(day),
        }
    }

    #[test]
    fn approved_exits_only_lists_approved_requests() {
        let records = vec![
            request("A101", "John", RequestStatus::Approved, 10),
            request("B202", "Priya", RequestStatus::Pending, 11),
            request("C303", "Amit", RequestStatus::Approved, 9),
        ];
        let views = approved_exits(&records);
        let rooms: Vec<_> = views.iter().map(|view| view.room_number.as_str()).collect();
        assert_eq!(rooms, vec!["C303", "A101"]);
    }

    #[test]
    fn room_history_groups_by_room_then_time() {
        let records = vec![
            request("B202", "Priya", RequestStatus::Pending, 15),
            request("A101", "John", RequestStatus::Approved, 12),
            request("A101", "Mei", RequestStatus::Rejected, 3),
        ];
        let history = room_history(&records);
        let order: Vec<_> = history
            .iter()
            .map(|entry| (entry.room_number.as_str(), entry.tenant_name.as_str()))
            .collect();
        assert_eq!(order, vec![("A101", "Mei"), ("A101", "John"), ("B202", "Priya")]);
    }

    #[test]
    fn timeline_interleaves_exits_and_damage_chronologically() {
        let requests = vec![request("A101", "John", RequestStatus::Approved, 10)];
        let reports = vec![DamageReport {
            report_id: DamageReportId("dmg-1".to_string()),
            tenant_id: "T-John".to_string(),
            room_number: "A101".to_string(),
            damaged_items: vec![DamagedItem {
                item: "Window".to_string(),
                price: Decimal::new(4500, 2),
            }],
            estimated_cost: Decimal::new(4500, 2),
            document_url: None,
            reported_at: at(8),
        }];

        let events = move_timeline(&requests, &reports);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].description,
            "Damage reported in room A101 by T-John: Window (estimated 45.00)"
        );
        assert_eq!(
            events[1].description,
            "John requested to move out of room A101 (approved)"
        );
    }

    #[test]
    fn tenant_view_uses_lowercase_status_label() {
        let view = tenant_exit_view(request("C103", "Amit", RequestStatus::Pending, 20));
        assert_eq!(view.status, "pending");
        assert_eq!(view.document_url, None);
    }
}
