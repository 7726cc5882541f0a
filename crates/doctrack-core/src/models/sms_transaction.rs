//! SMS transaction history: one append-only ledger row per send attempt.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix shared by every ledger row name.
pub const TRANSACTION_PREFIX: &str = "SMSTRNSCT";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmsStatus {
    Approved,
    Failed,
}

impl SmsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsStatus::Approved => "Approved",
            SmsStatus::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<SmsStatus> {
        match value {
            "Approved" => Some(SmsStatus::Approved),
            "Failed" => Some(SmsStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsTransaction {
    pub id: Uuid,
    pub name: String,
    pub credit_amount: Decimal,
    pub status: SmsStatus,
    pub initiated_by: String,
    pub message: String,
    pub recipient: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSmsTransaction {
    pub name: String,
    pub credit_amount: Decimal,
    pub status: SmsStatus,
    pub initiated_by: String,
    pub message: String,
    pub recipient: String,
    pub user_id: Uuid,
}

/// Name prefix for all transactions of the month containing `at`,
/// e.g. `SMSTRNSCT-032026-`.
pub fn month_prefix(at: DateTime<Utc>) -> String {
    format!("{TRANSACTION_PREFIX}-{:02}{}-", at.month(), at.year())
}

/// Full transaction name for the `sequence`-th send of the month.
pub fn transaction_name(at: DateTime<Utc>, sequence: u64) -> String {
    format!("{}{sequence:03}", month_prefix(at))
}
