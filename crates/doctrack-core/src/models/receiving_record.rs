//! Receiving record domain model: one inbound citizen request.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document_image::DocumentImage;
use super::remark::RecordRemark;
use super::user::UserSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "disapproved")]
    Disapproved,
    #[serde(rename = "served")]
    Served,
    #[serde(rename = "on process")]
    OnProcess,
    #[serde(rename = "for releasing")]
    ForReleasing,
    #[serde(rename = "completed")]
    Completed,
}

impl RecordStatus {
    /// Statuses a record may be created with or moved to by a department
    /// update. `Completed` is only reachable through mark-completed.
    pub const WORKFLOW: [RecordStatus; 6] = [
        RecordStatus::Pending,
        RecordStatus::Approved,
        RecordStatus::Disapproved,
        RecordStatus::Served,
        RecordStatus::OnProcess,
        RecordStatus::ForReleasing,
    ];

    /// Statuses counted as "outgoing" on the dashboard.
    pub const OUTGOING: [RecordStatus; 3] = [
        RecordStatus::Approved,
        RecordStatus::Served,
        RecordStatus::ForReleasing,
    ];

    /// Statuses still awaiting department action.
    pub const PENDING_ACTION: [RecordStatus; 2] = [RecordStatus::Pending, RecordStatus::OnProcess];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Disapproved => "disapproved",
            RecordStatus::Served => "served",
            RecordStatus::OnProcess => "on process",
            RecordStatus::ForReleasing => "for releasing",
            RecordStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<RecordStatus> {
        match value {
            "pending" => Some(RecordStatus::Pending),
            "approved" => Some(RecordStatus::Approved),
            "disapproved" => Some(RecordStatus::Disapproved),
            "served" => Some(RecordStatus::Served),
            "on process" => Some(RecordStatus::OnProcess),
            "for releasing" => Some(RecordStatus::ForReleasing),
            "completed" => Some(RecordStatus::Completed),
            _ => None,
        }
    }

    pub fn is_workflow(&self) -> bool {
        Self::WORKFLOW.contains(self)
    }

    /// Whether a record in this status may be marked completed.
    pub fn can_complete(&self) -> bool {
        matches!(self, RecordStatus::Approved | RecordStatus::Disapproved)
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivingRecord {
    pub id: Uuid,
    pub control_no: String,
    pub date: NaiveDate,
    pub particulars: Option<String>,
    pub department: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub organization_barangay: Option<String>,
    pub municipality_address: Option<String>,
    pub province: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub action_taken: Option<String>,
    pub amount_approved: Option<Decimal>,
    pub status: RecordStatus,
    pub district: Option<String>,
    pub requisitioner: Option<String>,
    pub served_request: Option<String>,
    /// Latest remark, denormalized from the remark history.
    pub remarks: Option<String>,
    pub user_id: Uuid,
    pub processed_by_user_id: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReceivingRecord {
    pub control_no: String,
    pub date: NaiveDate,
    pub particulars: Option<String>,
    pub department: String,
    pub category: Option<String>,
    pub record_type: Option<String>,
    pub organization_barangay: Option<String>,
    pub municipality_address: Option<String>,
    pub province: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub action_taken: Option<String>,
    pub amount_approved: Option<Decimal>,
    pub status: RecordStatus,
    pub district: Option<String>,
    pub requisitioner: Option<String>,
    pub served_request: Option<String>,
    pub remarks: Option<String>,
    pub user_id: Uuid,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Field-level patch. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateReceivingRecord {
    pub control_no: Option<String>,
    pub date: Option<NaiveDate>,
    pub particulars: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub record_type: Option<String>,
    pub organization_barangay: Option<String>,
    pub municipality_address: Option<String>,
    pub province: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub action_taken: Option<String>,
    pub amount_approved: Option<Decimal>,
    pub status: Option<RecordStatus>,
    pub district: Option<String>,
    pub requisitioner: Option<String>,
    pub served_request: Option<String>,
    pub remarks: Option<String>,
    pub processed_by_user_id: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// A remark together with its author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemarkEntry {
    #[serde(flatten)]
    pub remark: RecordRemark,
    pub user: Option<UserSummary>,
}

/// A record with its eager-loaded relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: ReceivingRecord,
    pub user: Option<UserSummary>,
    pub processed_by: Option<UserSummary>,
    pub remarks_history: Vec<RemarkEntry>,
    pub images: Vec<DocumentImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in RecordStatus::WORKFLOW
            .into_iter()
            .chain([RecordStatus::Completed])
        {
            assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RecordStatus::parse("Approved"), None);
    }

    #[test]
    fn only_decided_records_can_complete() {
        assert!(RecordStatus::Approved.can_complete());
        assert!(RecordStatus::Disapproved.can_complete());
        for status in [
            RecordStatus::Pending,
            RecordStatus::Served,
            RecordStatus::OnProcess,
            RecordStatus::ForReleasing,
            RecordStatus::Completed,
        ] {
            assert!(!status.can_complete(), "{status} must not complete");
        }
    }

    #[test]
    fn completed_is_not_a_workflow_status() {
        assert!(!RecordStatus::Completed.is_workflow());
        assert!(RecordStatus::OnProcess.is_workflow());
    }

    #[test]
    fn status_serializes_with_spaces() {
        let json = serde_json::to_string(&RecordStatus::ForReleasing).unwrap();
        assert_eq!(json, "\"for releasing\"");
    }
}
