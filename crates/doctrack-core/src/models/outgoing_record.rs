//! Outgoing record: an outbound document (legal docs, memos, fuel requests).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutgoingCategory {
    LegalDocs,
    Memo,
    FuelRequests,
}

impl OutgoingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutgoingCategory::LegalDocs => "legal_docs",
            OutgoingCategory::Memo => "memo",
            OutgoingCategory::FuelRequests => "fuel_requests",
        }
    }

    pub fn parse(value: &str) -> Option<OutgoingCategory> {
        match value {
            "legal_docs" => Some(OutgoingCategory::LegalDocs),
            "memo" => Some(OutgoingCategory::Memo),
            "fuel_requests" => Some(OutgoingCategory::FuelRequests),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingRecord {
    pub id: Uuid,
    pub category: OutgoingCategory,
    pub date: NaiveDate,
    pub particulars: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub recipient: Option<String>,
    pub vehicle: Option<String>,
    pub driver: Option<String>,
    pub amount: Option<Decimal>,
    pub file_path: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOutgoingRecord {
    pub category: OutgoingCategory,
    pub date: NaiveDate,
    pub particulars: Option<String>,
    pub record_type: Option<String>,
    pub recipient: Option<String>,
    pub vehicle: Option<String>,
    pub driver: Option<String>,
    pub amount: Option<Decimal>,
    pub file_path: Option<String>,
    pub user_id: Uuid,
}

/// An outgoing record with its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingDetail {
    #[serde(flatten)]
    pub record: OutgoingRecord,
    pub user: Option<UserSummary>,
}
