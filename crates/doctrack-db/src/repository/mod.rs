//! SurrealDB repository implementations.

pub mod outgoing_record;
pub mod receiving_record;
pub mod session;
pub mod sms_ledger;
pub mod user;

pub use outgoing_record::SurrealOutgoingRecordRepository;
pub use receiving_record::SurrealReceivingRecordRepository;
pub use session::SurrealSessionRepository;
pub use sms_ledger::SurrealSmsLedgerRepository;
pub use user::SurrealUserRepository;

use chrono::NaiveDate;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Calendar dates are stored as `YYYY-MM-DD` strings.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidRow(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(value: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.as_deref().map(|v| parse_uuid(v, what)).transpose()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| DbError::InvalidRow(format!("invalid date '{value}': {e}")))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Joins WHERE predicates; an empty list yields an empty clause.
pub(crate) fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}
