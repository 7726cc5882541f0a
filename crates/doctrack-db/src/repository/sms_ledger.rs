//! SurrealDB implementation of [`SmsLedgerRepository`].
//!
//! The balance decrement and the ledger insert run in one transaction.
//! The `sms_credits >= 0` assertion on `user` aborts the whole block when
//! a concurrent send has already spent the credits.

use chrono::{DateTime, Utc};
use doctrack_core::error::DocTrackResult;
use doctrack_core::models::sms_transaction::{CreateSmsTransaction, SmsStatus, SmsTransaction};
use doctrack_core::repository::{PaginatedResult, Pagination, SmsLedgerRepository, SmsLogFilter};
use rust_decimal::Decimal;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use super::{CountRow, parse_uuid, where_clause};
use crate::error::DbError;

const ENTITY: &str = "sms_transaction";

#[derive(Debug, SurrealValue)]
struct LedgerRow {
    record_id: String,
    name: String,
    credit_amount: Decimal,
    status: String,
    initiated_by: String,
    message: String,
    recipient: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl LedgerRow {
    fn try_into_transaction(self) -> Result<SmsTransaction, DbError> {
        let status = SmsStatus::parse(&self.status)
            .ok_or_else(|| DbError::InvalidRow(format!("unknown sms status: {}", self.status)))?;
        Ok(SmsTransaction {
            id: parse_uuid(&self.record_id, ENTITY)?,
            name: self.name,
            credit_amount: self.credit_amount,
            status,
            initiated_by: self.initiated_by,
            message: self.message,
            recipient: self.recipient,
            user_id: parse_uuid(&self.user_id, "user")?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the SMS credit ledger.
#[derive(Clone)]
pub struct SurrealSmsLedgerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSmsLedgerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SmsLedgerRepository for SurrealSmsLedgerRepository<C> {
    async fn count_with_prefix(&self, prefix: &str) -> DocTrackResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM sms_transaction \
                 WHERE string::starts_with(name, $prefix) GROUP ALL",
            )
            .bind(("prefix", prefix.to_string()))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(count_rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn charge(
        &self,
        user_id: Uuid,
        cost: Decimal,
        entry: CreateSmsTransaction,
    ) -> DocTrackResult<SmsTransaction> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('user', $user_id) SET \
                 sms_credits -= $cost, updated_at = time::now(); \
                 CREATE type::record('sms_transaction', $id) SET \
                 name = $name, credit_amount = $cost, status = $status, \
                 initiated_by = $initiated_by, message = $message, \
                 recipient = $recipient, user_id = $user_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", user_id.to_string()))
            .bind(("cost", cost))
            .bind(("name", entry.name))
            .bind(("status", entry.status.as_str().to_string()))
            .bind(("initiated_by", entry.initiated_by))
            .bind(("message", entry.message))
            .bind(("recipient", entry.recipient))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| {
                if e.to_string().contains("sms_credits") {
                    warn!(user_id = %user_id, %cost, "SMS charge rejected by balance constraint");
                    DbError::InsufficientBalance
                } else {
                    DbError::from_statement(ENTITY, e)
                }
            })?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('sms_transaction', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LedgerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, id_str))?;

        Ok(row.try_into_transaction()?)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: SmsLogFilter,
        pagination: Pagination,
    ) -> DocTrackResult<PaginatedResult<SmsTransaction>> {
        let mut conditions = vec!["user_id = $user_id"];
        if filter.from.is_some() {
            conditions.push("created_at >= $from");
        }
        if filter.before.is_some() {
            conditions.push("created_at < $before");
        }
        let where_sql = where_clause(&conditions);

        let query = format!(
            "SELECT count() AS total FROM sms_transaction{where_sql} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM sms_transaction{where_sql} \
             ORDER BY created_at DESC LIMIT $limit START $offset"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .bind(("from", filter.from))
            .bind(("before", filter.before))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<LedgerRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(LedgerRow::try_into_transaction)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
