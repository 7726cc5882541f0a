//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Record queries take a
//! [`RecordScope`] so department isolation is enforced at the data layer
//! as well as in the policy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DocTrackResult;
use crate::models::{
    document_image::{CreateDocumentImage, DocumentImage},
    outgoing_record::{CreateOutgoingRecord, OutgoingCategory, OutgoingRecord},
    receiving_record::{
        CreateReceivingRecord, ReceivingRecord, RecordStatus, UpdateReceivingRecord,
    },
    remark::{CreateRecordRemark, RecordRemark},
    session::{CreateSession, Session},
    sms_transaction::{CreateSmsTransaction, SmsTransaction},
    user::{CreateUser, UpdateUser, User, UserRole},
};

/// Fixed page size for every paginated listing.
pub const PAGE_SIZE: u64 = 15;

/// Highest page whose offset still fits a signed 64-bit `START`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / PAGE_SIZE;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// One-based page of [`PAGE_SIZE`] rows. Page 0 is treated as page 1
    /// and pages past [`MAX_PAGE`] are clamped to it.
    pub fn page(page: u64) -> Self {
        let page = page.clamp(1, MAX_PAGE);
        Self {
            offset: (page - 1).saturating_mul(PAGE_SIZE),
            limit: PAGE_SIZE,
        }
    }

    pub fn current_page(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// Convert each item, keeping the page bookkeeping.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }

    pub fn current_page(&self) -> u64 {
        Pagination {
            offset: self.offset,
            limit: self.limit,
        }
        .current_page()
    }

    pub fn last_page(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.total.div_ceil(self.limit).max(1)
        }
    }
}

// ---------------------------------------------------------------------------
// Users & sessions
// ---------------------------------------------------------------------------

/// Query filters for the user directory.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive exact department match.
    pub department: Option<String>,
    pub role: Option<UserRole>,
    /// Case-insensitive substring over email, first and last name.
    pub search: Option<String>,
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = DocTrackResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DocTrackResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = DocTrackResult<User>> + Send;
    /// Fetch several users at once; unknown ids are skipped.
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = DocTrackResult<Vec<User>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = DocTrackResult<User>> + Send;
    /// Hard delete.
    fn delete(&self, id: Uuid) -> impl Future<Output = DocTrackResult<()>> + Send;
    fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DocTrackResult<PaginatedResult<User>>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = DocTrackResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DocTrackResult<Session>> + Send;
    /// Invalidate a single session.
    fn invalidate(&self, id: Uuid) -> impl Future<Output = DocTrackResult<()>> + Send;
    /// Invalidate all sessions for a user (e.g., on password change).
    fn invalidate_user_sessions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = DocTrackResult<()>> + Send;
    /// Remove all expired sessions.
    fn cleanup_expired(&self) -> impl Future<Output = DocTrackResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Receiving records
// ---------------------------------------------------------------------------

/// Which receiving records a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordScope {
    /// Universal visibility (super admin, intake desk).
    All,
    /// Only records whose department equals this value, compared
    /// case-insensitively. Stored lowercased.
    Department(String),
}

impl RecordScope {
    pub fn department(name: &str) -> Self {
        RecordScope::Department(name.trim().to_lowercase())
    }

    pub fn allows(&self, department: &str) -> bool {
        match self {
            RecordScope::All => true,
            RecordScope::Department(d) => department.trim().to_lowercase() == *d,
        }
    }
}

/// Query filters over receiving records. Empty vectors mean "any".
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub scope: RecordScope,
    pub categories: Vec<String>,
    pub statuses: Vec<RecordStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// `Some(true)` = has a processor, `Some(false)` = unprocessed.
    pub processed: Option<bool>,
    /// Case-insensitive substring of `municipality_address`.
    pub municipality: Option<String>,
}

impl RecordFilter {
    pub fn new(scope: RecordScope) -> Self {
        Self {
            scope,
            categories: Vec::new(),
            statuses: Vec::new(),
            created_from: None,
            created_before: None,
            processed: None,
            municipality: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories = vec![category.into()];
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn statuses(mut self, statuses: &[RecordStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// Restrict to rows created in `[from, before)`.
    pub fn created_between(mut self, from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_before = Some(before);
        self
    }

    pub fn processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn municipality(mut self, name: impl Into<String>) -> Self {
        self.municipality = Some(name.into());
        self
    }
}

/// Row count for one category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub total: u64,
}

pub trait ReceivingRecordRepository: Send + Sync {
    fn create(
        &self,
        input: CreateReceivingRecord,
    ) -> impl Future<Output = DocTrackResult<ReceivingRecord>> + Send;
    /// Fetch a record visible under `scope`. Records outside the scope
    /// are reported as not found.
    fn get_by_id(
        &self,
        id: Uuid,
        scope: &RecordScope,
    ) -> impl Future<Output = DocTrackResult<ReceivingRecord>> + Send;
    fn get_by_control_no(
        &self,
        control_no: &str,
    ) -> impl Future<Output = DocTrackResult<ReceivingRecord>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateReceivingRecord,
    ) -> impl Future<Output = DocTrackResult<ReceivingRecord>> + Send;
    /// Hard delete; remarks and images are removed in the same transaction.
    fn delete(&self, id: Uuid) -> impl Future<Output = DocTrackResult<()>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: &RecordFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DocTrackResult<PaginatedResult<ReceivingRecord>>> + Send;
    fn count(&self, filter: &RecordFilter) -> impl Future<Output = DocTrackResult<u64>> + Send;
    /// Counts per non-null category.
    fn count_by_category(
        &self,
        filter: &RecordFilter,
    ) -> impl Future<Output = DocTrackResult<Vec<CategoryCount>>> + Send;

    /// Append a remark. No update or delete operations exist.
    fn append_remark(
        &self,
        input: CreateRecordRemark,
    ) -> impl Future<Output = DocTrackResult<RecordRemark>> + Send;
    /// Oldest first.
    fn list_remarks(
        &self,
        record_id: Uuid,
    ) -> impl Future<Output = DocTrackResult<Vec<RecordRemark>>> + Send;
    fn add_image(
        &self,
        input: CreateDocumentImage,
    ) -> impl Future<Output = DocTrackResult<DocumentImage>> + Send;
    /// In upload order.
    fn list_images(
        &self,
        record_id: Uuid,
    ) -> impl Future<Output = DocTrackResult<Vec<DocumentImage>>> + Send;
}

// ---------------------------------------------------------------------------
// Outgoing records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OutgoingFilter {
    pub category: Option<OutgoingCategory>,
    /// Case-insensitive substring over particulars, recipient, type,
    /// vehicle and driver.
    pub search: Option<String>,
}

pub trait OutgoingRecordRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOutgoingRecord,
    ) -> impl Future<Output = DocTrackResult<OutgoingRecord>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DocTrackResult<OutgoingRecord>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DocTrackResult<()>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: OutgoingFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DocTrackResult<PaginatedResult<OutgoingRecord>>> + Send;
}

// ---------------------------------------------------------------------------
// SMS ledger (append-only)
// ---------------------------------------------------------------------------

/// Date window for ledger listings, `[from, before)`.
#[derive(Debug, Clone, Default)]
pub struct SmsLogFilter {
    pub from: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

pub trait SmsLedgerRepository: Send + Sync {
    /// Number of ledger rows whose name starts with `prefix`.
    ///
    /// Advisory only: two concurrent sends may observe the same count.
    fn count_with_prefix(&self, prefix: &str) -> impl Future<Output = DocTrackResult<u64>> + Send;
    /// Deduct `cost` from the user's balance and append `entry`, both in
    /// one transaction. Fails without writing anything if the balance
    /// would go negative.
    fn charge(
        &self,
        user_id: Uuid,
        cost: Decimal,
        entry: CreateSmsTransaction,
    ) -> impl Future<Output = DocTrackResult<SmsTransaction>> + Send;
    /// Newest first.
    fn list_for_user(
        &self,
        user_id: Uuid,
        filter: SmsLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DocTrackResult<PaginatedResult<SmsTransaction>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_map_to_offsets() {
        assert_eq!(Pagination::page(1).offset, 0);
        assert_eq!(Pagination::page(3).offset, 30);
        assert_eq!(Pagination::page(0).offset, 0);
        assert_eq!(Pagination::page(3).current_page(), 3);
    }

    #[test]
    fn oversized_page_is_clamped() {
        let page = Pagination::page(u64::MAX);
        assert_eq!(page.offset, (MAX_PAGE - 1) * PAGE_SIZE);
        assert!(page.offset <= i64::MAX as u64);
        assert_eq!(page.current_page(), MAX_PAGE);
    }

    #[test]
    fn last_page_rounds_up() {
        let page: PaginatedResult<()> = PaginatedResult {
            items: vec![],
            total: 31,
            offset: 0,
            limit: PAGE_SIZE,
        };
        assert_eq!(page.last_page(), 3);

        let empty: PaginatedResult<()> = PaginatedResult {
            items: vec![],
            total: 0,
            offset: 0,
            limit: PAGE_SIZE,
        };
        assert_eq!(empty.last_page(), 1);
    }

    #[test]
    fn department_scope_ignores_case() {
        let scope = RecordScope::department("Barangay Affairs");
        assert!(scope.allows("barangay affairs"));
        assert!(scope.allows("BARANGAY AFFAIRS"));
        assert!(!scope.allows("Financial Assistance"));
        assert!(RecordScope::All.allows("anything"));
    }
}
