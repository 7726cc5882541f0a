//! SurrealDB implementation of [`OutgoingRecordRepository`].

use chrono::{DateTime, Utc};
use doctrack_core::error::DocTrackResult;
use doctrack_core::models::outgoing_record::{
    CreateOutgoingRecord, OutgoingCategory, OutgoingRecord,
};
use doctrack_core::repository::{
    OutgoingFilter, OutgoingRecordRepository, PaginatedResult, Pagination,
};
use rust_decimal::Decimal;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, format_date, parse_date, parse_uuid, where_clause};
use crate::error::DbError;

const ENTITY: &str = "outgoing_record";

#[derive(Debug, SurrealValue)]
struct OutgoingRow {
    record_id: String,
    category: String,
    date: String,
    particulars: Option<String>,
    record_type: Option<String>,
    recipient: Option<String>,
    vehicle: Option<String>,
    driver: Option<String>,
    amount: Option<Decimal>,
    file_path: Option<String>,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OutgoingRow {
    fn try_into_record(self) -> Result<OutgoingRecord, DbError> {
        let category = OutgoingCategory::parse(&self.category).ok_or_else(|| {
            DbError::InvalidRow(format!("unknown outgoing category: {}", self.category))
        })?;
        Ok(OutgoingRecord {
            id: parse_uuid(&self.record_id, ENTITY)?,
            category,
            date: parse_date(&self.date)?,
            particulars: self.particulars,
            record_type: self.record_type,
            recipient: self.recipient,
            vehicle: self.vehicle,
            driver: self.driver,
            amount: self.amount,
            file_path: self.file_path,
            user_id: parse_uuid(&self.user_id, "user")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the outgoing record repository.
#[derive(Clone)]
pub struct SurrealOutgoingRecordRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOutgoingRecordRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OutgoingRecordRepository for SurrealOutgoingRecordRepository<C> {
    async fn create(&self, input: CreateOutgoingRecord) -> DocTrackResult<OutgoingRecord> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('outgoing_record', $id) SET \
                 category = $category, date = $date, \
                 particulars = $particulars, record_type = $record_type, \
                 recipient = $recipient, vehicle = $vehicle, \
                 driver = $driver, amount = $amount, \
                 file_path = $file_path, user_id = $user_id",
            )
            .bind(("id", id.to_string()))
            .bind(("category", input.category.as_str().to_string()))
            .bind(("date", format_date(input.date)))
            .bind(("particulars", input.particulars))
            .bind(("record_type", input.record_type))
            .bind(("recipient", input.recipient))
            .bind(("vehicle", input.vehicle))
            .bind(("driver", input.driver))
            .bind(("amount", input.amount))
            .bind(("file_path", input.file_path))
            .bind(("user_id", input.user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> DocTrackResult<OutgoingRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('outgoing_record', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OutgoingRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, id_str))?;

        Ok(row.try_into_record()?)
    }

    async fn delete(&self, id: Uuid) -> DocTrackResult<()> {
        self.db
            .query("DELETE type::record('outgoing_record', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: OutgoingFilter,
        pagination: Pagination,
    ) -> DocTrackResult<PaginatedResult<OutgoingRecord>> {
        let mut conditions = Vec::new();
        if filter.category.is_some() {
            conditions.push("category = $category");
        }
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(particulars ?? ''), $search) \
                 OR string::contains(string::lowercase(recipient ?? ''), $search) \
                 OR string::contains(string::lowercase(record_type ?? ''), $search) \
                 OR string::contains(string::lowercase(vehicle ?? ''), $search) \
                 OR string::contains(string::lowercase(driver ?? ''), $search))",
            );
        }
        let where_sql = where_clause(&conditions);

        let query = format!(
            "SELECT count() AS total FROM outgoing_record{where_sql} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM outgoing_record{where_sql} \
             ORDER BY created_at DESC LIMIT $limit START $offset"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("category", filter.category.map(|c| c.as_str().to_string())))
            .bind(("search", filter.search.map(|s| s.trim().to_lowercase())))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<OutgoingRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(OutgoingRow::try_into_record)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
