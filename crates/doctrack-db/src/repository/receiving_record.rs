//! SurrealDB implementation of [`ReceivingRecordRepository`].
//!
//! Also owns the record's remark history and document images, which
//! live in their own tables keyed by `receiving_record_id`.

use chrono::{DateTime, Utc};
use doctrack_core::error::DocTrackResult;
use doctrack_core::models::document_image::{CreateDocumentImage, DocumentImage};
use doctrack_core::models::receiving_record::{
    CreateReceivingRecord, ReceivingRecord, RecordStatus, UpdateReceivingRecord,
};
use doctrack_core::models::remark::{CreateRecordRemark, RecordRemark};
use doctrack_core::repository::{
    CategoryCount, PaginatedResult, Pagination, ReceivingRecordRepository, RecordFilter,
    RecordScope,
};
use rust_decimal::Decimal;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, format_date, parse_date, parse_opt_uuid, parse_uuid, where_clause};
use crate::error::DbError;

const ENTITY: &str = "receiving_record";

#[derive(Debug, SurrealValue)]
struct RecordRow {
    record_id: String,
    control_no: String,
    date: String,
    particulars: Option<String>,
    department: String,
    category: Option<String>,
    record_type: Option<String>,
    organization_barangay: Option<String>,
    municipality_address: Option<String>,
    province: Option<String>,
    name: Option<String>,
    contact: Option<String>,
    action_taken: Option<String>,
    amount_approved: Option<Decimal>,
    status: String,
    district: Option<String>,
    requisitioner: Option<String>,
    served_request: Option<String>,
    remarks: Option<String>,
    user_id: String,
    processed_by_user_id: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordRow {
    fn try_into_record(self) -> Result<ReceivingRecord, DbError> {
        let status = RecordStatus::parse(&self.status)
            .ok_or_else(|| DbError::InvalidRow(format!("unknown record status: {}", self.status)))?;
        Ok(ReceivingRecord {
            id: parse_uuid(&self.record_id, ENTITY)?,
            control_no: self.control_no,
            date: parse_date(&self.date)?,
            particulars: self.particulars,
            department: self.department,
            category: self.category,
            record_type: self.record_type,
            organization_barangay: self.organization_barangay,
            municipality_address: self.municipality_address,
            province: self.province,
            name: self.name,
            contact: self.contact,
            action_taken: self.action_taken,
            amount_approved: self.amount_approved,
            status,
            district: self.district,
            requisitioner: self.requisitioner,
            served_request: self.served_request,
            remarks: self.remarks,
            user_id: parse_uuid(&self.user_id, "user")?,
            processed_by_user_id: parse_opt_uuid(self.processed_by_user_id, "processor")?,
            processed_at: self.processed_at,
            approved_at: self.approved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RemarkRow {
    record_id: String,
    receiving_record_id: String,
    user_id: String,
    remark: String,
    created_at: DateTime<Utc>,
}

impl RemarkRow {
    fn try_into_remark(self) -> Result<RecordRemark, DbError> {
        Ok(RecordRemark {
            id: parse_uuid(&self.record_id, "record_remark")?,
            receiving_record_id: parse_uuid(&self.receiving_record_id, ENTITY)?,
            user_id: parse_uuid(&self.user_id, "user")?,
            remark: self.remark,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ImageRow {
    record_id: String,
    receiving_record_id: String,
    file_path: String,
    position: u32,
    created_at: DateTime<Utc>,
}

impl ImageRow {
    fn try_into_image(self) -> Result<DocumentImage, DbError> {
        Ok(DocumentImage {
            id: parse_uuid(&self.record_id, "document_image")?,
            receiving_record_id: parse_uuid(&self.receiving_record_id, ENTITY)?,
            file_path: self.file_path,
            position: self.position,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CategoryRow {
    category: String,
    total: u64,
}

/// Bound parameters shared by every filtered query.
struct FilterParams {
    where_sql: String,
    department: Option<String>,
    categories: Vec<String>,
    statuses: Vec<String>,
    created_from: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
    municipality: Option<String>,
}

impl FilterParams {
    fn new(filter: &RecordFilter, extra: &[&'static str]) -> Self {
        let mut conditions: Vec<&str> = extra.to_vec();
        let department = match &filter.scope {
            RecordScope::All => None,
            RecordScope::Department(d) => {
                conditions.push("string::lowercase(department) = $department");
                Some(d.clone())
            }
        };
        if !filter.categories.is_empty() {
            conditions.push("category IN $categories");
        }
        if !filter.statuses.is_empty() {
            conditions.push("status IN $statuses");
        }
        if filter.created_from.is_some() {
            conditions.push("created_at >= $created_from");
        }
        if filter.created_before.is_some() {
            conditions.push("created_at < $created_before");
        }
        match filter.processed {
            Some(true) => conditions.push("processed_by_user_id != NONE"),
            Some(false) => conditions.push("processed_by_user_id = NONE"),
            None => {}
        }
        if filter.municipality.is_some() {
            conditions.push(
                "string::contains(string::lowercase(municipality_address ?? ''), $municipality)",
            );
        }

        Self {
            where_sql: where_clause(&conditions),
            department,
            categories: filter.categories.clone(),
            statuses: filter
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            created_from: filter.created_from,
            created_before: filter.created_before,
            municipality: filter.municipality.as_ref().map(|m| m.trim().to_lowercase()),
        }
    }
}

/// Runs `$sql` with every [`FilterParams`] value bound.
macro_rules! filtered_query {
    ($db:expr, $sql:expr, $params:expr) => {{
        let params = $params;
        $db.query($sql)
            .bind(("department", params.department))
            .bind(("categories", params.categories))
            .bind(("statuses", params.statuses))
            .bind(("created_from", params.created_from))
            .bind(("created_before", params.created_before))
            .bind(("municipality", params.municipality))
            .await
            .map_err(DbError::from)?
    }};
}

/// SurrealDB implementation of the receiving record repository.
#[derive(Clone)]
pub struct SurrealReceivingRecordRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReceivingRecordRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ReceivingRecordRepository for SurrealReceivingRecordRepository<C> {
    async fn create(&self, input: CreateReceivingRecord) -> DocTrackResult<ReceivingRecord> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('receiving_record', $id) SET \
                 control_no = $control_no, date = $date, \
                 particulars = $particulars, department = $department, \
                 category = $category, record_type = $record_type, \
                 organization_barangay = $organization_barangay, \
                 municipality_address = $municipality_address, \
                 province = $province, name = $name, contact = $contact, \
                 action_taken = $action_taken, \
                 amount_approved = $amount_approved, status = $status, \
                 district = $district, requisitioner = $requisitioner, \
                 served_request = $served_request, remarks = $remarks, \
                 user_id = $user_id, approved_at = $approved_at",
            )
            .bind(("id", id.to_string()))
            .bind(("control_no", input.control_no))
            .bind(("date", format_date(input.date)))
            .bind(("particulars", input.particulars))
            .bind(("department", input.department))
            .bind(("category", input.category))
            .bind(("record_type", input.record_type))
            .bind(("organization_barangay", input.organization_barangay))
            .bind(("municipality_address", input.municipality_address))
            .bind(("province", input.province))
            .bind(("name", input.name))
            .bind(("contact", input.contact))
            .bind(("action_taken", input.action_taken))
            .bind(("amount_approved", input.amount_approved))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("district", input.district))
            .bind(("requisitioner", input.requisitioner))
            .bind(("served_request", input.served_request))
            .bind(("remarks", input.remarks))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("approved_at", input.approved_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        self.get_by_id(id, &RecordScope::All).await
    }

    async fn get_by_id(&self, id: Uuid, scope: &RecordScope) -> DocTrackResult<ReceivingRecord> {
        let id_str = id.to_string();
        let (sql, department) = match scope {
            RecordScope::All => (
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('receiving_record', $id)",
                None,
            ),
            RecordScope::Department(d) => (
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('receiving_record', $id) \
                 WHERE string::lowercase(department) = $department",
                Some(d.clone()),
            ),
        };

        let mut result = self
            .db
            .query(sql)
            .bind(("id", id_str.clone()))
            .bind(("department", department))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecordRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, id_str))?;

        Ok(row.try_into_record()?)
    }

    async fn get_by_control_no(&self, control_no: &str) -> DocTrackResult<ReceivingRecord> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM receiving_record \
                 WHERE control_no = $control_no",
            )
            .bind(("control_no", control_no.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecordRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, format!("control_no={control_no}")))?;

        Ok(row.try_into_record()?)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateReceivingRecord,
    ) -> DocTrackResult<ReceivingRecord> {
        self.get_by_id(id, &RecordScope::All).await?;

        let mut sets = Vec::new();
        macro_rules! set_if {
            ($field:ident) => {
                if input.$field.is_some() {
                    sets.push(concat!(stringify!($field), " = $", stringify!($field)));
                }
            };
        }
        set_if!(control_no);
        set_if!(date);
        set_if!(particulars);
        set_if!(department);
        set_if!(category);
        set_if!(record_type);
        set_if!(organization_barangay);
        set_if!(municipality_address);
        set_if!(province);
        set_if!(name);
        set_if!(contact);
        set_if!(action_taken);
        set_if!(amount_approved);
        set_if!(status);
        set_if!(district);
        set_if!(requisitioner);
        set_if!(served_request);
        set_if!(remarks);
        set_if!(processed_by_user_id);
        set_if!(processed_at);
        if input.approved_at.is_some() {
            // First approval wins.
            sets.push("approved_at = approved_at ?? $approved_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('receiving_record', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(v) = input.control_no {
            builder = builder.bind(("control_no", v));
        }
        if let Some(v) = input.date {
            builder = builder.bind(("date", format_date(v)));
        }
        if let Some(v) = input.particulars {
            builder = builder.bind(("particulars", v));
        }
        if let Some(v) = input.department {
            builder = builder.bind(("department", v));
        }
        if let Some(v) = input.category {
            builder = builder.bind(("category", v));
        }
        if let Some(v) = input.record_type {
            builder = builder.bind(("record_type", v));
        }
        if let Some(v) = input.organization_barangay {
            builder = builder.bind(("organization_barangay", v));
        }
        if let Some(v) = input.municipality_address {
            builder = builder.bind(("municipality_address", v));
        }
        if let Some(v) = input.province {
            builder = builder.bind(("province", v));
        }
        if let Some(v) = input.name {
            builder = builder.bind(("name", v));
        }
        if let Some(v) = input.contact {
            builder = builder.bind(("contact", v));
        }
        if let Some(v) = input.action_taken {
            builder = builder.bind(("action_taken", v));
        }
        if let Some(v) = input.amount_approved {
            builder = builder.bind(("amount_approved", v));
        }
        if let Some(v) = input.status {
            builder = builder.bind(("status", v.as_str().to_string()));
        }
        if let Some(v) = input.district {
            builder = builder.bind(("district", v));
        }
        if let Some(v) = input.requisitioner {
            builder = builder.bind(("requisitioner", v));
        }
        if let Some(v) = input.served_request {
            builder = builder.bind(("served_request", v));
        }
        if let Some(v) = input.remarks {
            builder = builder.bind(("remarks", v));
        }
        if let Some(v) = input.processed_by_user_id {
            builder = builder.bind(("processed_by_user_id", v.to_string()));
        }
        if let Some(v) = input.processed_at {
            builder = builder.bind(("processed_at", v));
        }
        if let Some(v) = input.approved_at {
            builder = builder.bind(("approved_at", v));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        self.get_by_id(id, &RecordScope::All).await
    }

    async fn delete(&self, id: Uuid) -> DocTrackResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE record_remark WHERE receiving_record_id = $id; \
                 DELETE document_image WHERE receiving_record_id = $id; \
                 DELETE type::record('receiving_record', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        pagination: Pagination,
    ) -> DocTrackResult<PaginatedResult<ReceivingRecord>> {
        let params = FilterParams::new(filter, &[]);
        let query = format!(
            "SELECT count() AS total FROM receiving_record{w} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM receiving_record{w} \
             ORDER BY created_at DESC LIMIT {limit} START {offset}",
            w = params.where_sql,
            limit = pagination.limit,
            offset = pagination.offset,
        );

        let mut result = filtered_query!(self.db, &query, params);

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<RecordRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(RecordRow::try_into_record)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count(&self, filter: &RecordFilter) -> DocTrackResult<u64> {
        let params = FilterParams::new(filter, &[]);
        let query = format!(
            "SELECT count() AS total FROM receiving_record{} GROUP ALL",
            params.where_sql
        );

        let mut result = filtered_query!(self.db, &query, params);
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(count_rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn count_by_category(&self, filter: &RecordFilter) -> DocTrackResult<Vec<CategoryCount>> {
        let params = FilterParams::new(filter, &["category != NONE"]);
        let query = format!(
            "SELECT category, count() AS total FROM receiving_record{} \
             GROUP BY category",
            params.where_sql
        );

        let mut result = filtered_query!(self.db, &query, params);
        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| CategoryCount {
                category: r.category,
                total: r.total,
            })
            .collect())
    }

    async fn append_remark(&self, input: CreateRecordRemark) -> DocTrackResult<RecordRemark> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('record_remark', $id) SET \
                 receiving_record_id = $record, user_id = $user_id, \
                 remark = $remark; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('record_remark', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("record", input.receiving_record_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("remark", input.remark))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("record_remark", e))?;

        let rows: Vec<RemarkRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("record_remark", id_str))?;

        Ok(row.try_into_remark()?)
    }

    async fn list_remarks(&self, record_id: Uuid) -> DocTrackResult<Vec<RecordRemark>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM record_remark \
                 WHERE receiving_record_id = $record ORDER BY created_at ASC",
            )
            .bind(("record", record_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RemarkRow> = result.take(0).map_err(DbError::from)?;
        let remarks = rows
            .into_iter()
            .map(RemarkRow::try_into_remark)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(remarks)
    }

    async fn add_image(&self, input: CreateDocumentImage) -> DocTrackResult<DocumentImage> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('document_image', $id) SET \
                 receiving_record_id = $record, file_path = $file_path, \
                 position = $position; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('document_image', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("record", input.receiving_record_id.to_string()))
            .bind(("file_path", input.file_path))
            .bind(("position", input.position))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("document_image", e))?;

        let rows: Vec<ImageRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("document_image", id_str))?;

        Ok(row.try_into_image()?)
    }

    async fn list_images(&self, record_id: Uuid) -> DocTrackResult<Vec<DocumentImage>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM document_image \
                 WHERE receiving_record_id = $record ORDER BY position ASC",
            )
            .bind(("record", record_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ImageRow> = result.take(0).map_err(DbError::from)?;
        let images = rows
            .into_iter()
            .map(ImageRow::try_into_image)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(images)
    }
}
