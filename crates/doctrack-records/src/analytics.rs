//! Dashboard rollups over receiving records.
//!
//! Every rollup is scoped like the department endpoints except the ORM
//! counts, which are always global.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use doctrack_core::error::{DocTrackError, DocTrackResult};
use doctrack_core::models::receiving_record::{RecordDetail, RecordStatus};
use doctrack_core::policy::{self, Caller};
use doctrack_core::repository::{
    PaginatedResult, Pagination, ReceivingRecordRepository, RecordFilter, RecordScope,
    UserRepository,
};
use serde::Serialize;

use crate::municipality::{self, MUNICIPALITIES, Municipality};
use crate::storage::FileStorage;
use crate::store::RecordService;

/// Categories fed by online reputation management channels.
pub const ORM_CATEGORIES: [&str; 3] = ["E-Concern", "FB Pages", "Contact"];

/// Categories shown on the incoming analytics chart, in display order.
pub const INCOMING_CATEGORIES: [&str; 7] = [
    "Barangay Affairs",
    "Financial Assistance",
    "Social Services",
    "Use of Facilities",
    "Appointment/Meeting",
    "Other Request",
    "Use of Vehicle and Ambulance",
];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const APPROVED_LIKE: [RecordStatus; 2] = [RecordStatus::Approved, RecordStatus::Served];

/// Percentage change from `previous` to `current`, rounded to one decimal.
/// Zero when there is no previous value to compare against.
pub fn trend(current: u64, previous: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    (change * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub total_incoming: u64,
    pub incoming_trend: f64,
    pub total_outgoing: u64,
    pub outgoing_trend: f64,
    pub orm_submissions: u64,
    pub orm_trend: f64,
    pub pending_action: u64,
    pub pending_trend: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrmMonth {
    pub month: &'static str,
    pub econcern: u64,
    pub fb_pages: u64,
    pub contact: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityStats {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

/// First instant of `month` and of the month after it.
fn month_bounds(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?;
    Some((
        start.and_hms_opt(0, 0, 0)?.and_utc(),
        end.and_hms_opt(0, 0, 0)?.and_utc(),
    ))
}

fn current_and_previous_month(
    now: DateTime<Utc>,
) -> DocTrackResult<((DateTime<Utc>, DateTime<Utc>), (DateTime<Utc>, DateTime<Utc>))> {
    let current = month_bounds(now.year(), now.month());
    let previous = now
        .date_naive()
        .checked_sub_months(Months::new(1))
        .and_then(|d| month_bounds(d.year(), d.month()));
    current
        .zip(previous)
        .ok_or_else(|| DocTrackError::Internal("calendar month out of range".into()))
}

/// Read-side rollups, served by the same service that owns the records.
impl<R, U, F> RecordService<R, U, F>
where
    R: ReceivingRecordRepository,
    U: UserRepository,
    F: FileStorage,
{
    /// All-time totals for the dashboard cards, each with the
    /// month-over-month trend.
    pub async fn quick_stats(&self, caller: &Caller) -> DocTrackResult<QuickStats> {
        let scope = policy::record_scope(caller)?;
        let ((cur_from, cur_before), (prev_from, prev_before)) =
            current_and_previous_month(Utc::now())?;

        let incoming = RecordFilter::new(scope.clone());
        let outgoing = RecordFilter::new(scope.clone()).statuses(&RecordStatus::OUTGOING);
        let orm = RecordFilter::new(RecordScope::All).categories(ORM_CATEGORIES);
        let pending = RecordFilter::new(scope).statuses(&RecordStatus::PENDING_ACTION);

        let mut stats = [(0, 0.0); 4];
        for (slot, filter) in stats.iter_mut().zip([incoming, outgoing, orm, pending]) {
            let total = self.records.count(&filter).await?;
            let current = self
                .records
                .count(&filter.clone().created_between(cur_from, cur_before))
                .await?;
            let previous = self
                .records
                .count(&filter.created_between(prev_from, prev_before))
                .await?;
            *slot = (total, trend(current, previous));
        }
        let [incoming, outgoing, orm, pending] = stats;

        Ok(QuickStats {
            total_incoming: incoming.0,
            incoming_trend: incoming.1,
            total_outgoing: outgoing.0,
            outgoing_trend: outgoing.1,
            orm_submissions: orm.0,
            orm_trend: orm.1,
            pending_action: pending.0,
            pending_trend: pending.1,
        })
    }

    /// Pending, approved and rejected counts per fixed category.
    pub async fn incoming_analytics(&self, caller: &Caller) -> DocTrackResult<Vec<CategoryBreakdown>> {
        let scope = policy::record_scope(caller)?;
        let mut rows = Vec::with_capacity(INCOMING_CATEGORIES.len());
        for name in INCOMING_CATEGORIES {
            let base = RecordFilter::new(scope.clone()).category(name);
            rows.push(CategoryBreakdown {
                name: name.to_owned(),
                pending: self
                    .records
                    .count(&base.clone().statuses(&[RecordStatus::Pending]))
                    .await?,
                approved: self
                    .records
                    .count(&base.clone().statuses(&APPROVED_LIKE))
                    .await?,
                rejected: self
                    .records
                    .count(&base.statuses(&[RecordStatus::Disapproved]))
                    .await?,
            });
        }
        Ok(rows)
    }

    /// Outgoing-status records per category.
    pub async fn outgoing_analytics(&self, caller: &Caller) -> DocTrackResult<Vec<NamedValue>> {
        let filter =
            RecordFilter::new(policy::record_scope(caller)?).statuses(&RecordStatus::OUTGOING);
        Ok(self
            .records
            .count_by_category(&filter)
            .await?
            .into_iter()
            .map(|c| NamedValue {
                name: c.category,
                value: c.total,
            })
            .collect())
    }

    /// ORM submissions per calendar month of the current year.
    pub async fn orm_analytics(&self) -> DocTrackResult<Vec<OrmMonth>> {
        let year = Utc::now().year();
        let mut months = Vec::with_capacity(MONTH_LABELS.len());
        for (index, label) in MONTH_LABELS.into_iter().enumerate() {
            let (from, before) = month_bounds(year, index as u32 + 1)
                .ok_or_else(|| DocTrackError::Internal("calendar month out of range".into()))?;
            let mut counts = [0u64; 3];
            for (count, category) in counts.iter_mut().zip(ORM_CATEGORIES) {
                let filter = RecordFilter::new(RecordScope::All)
                    .category(category)
                    .created_between(from, before);
                *count = self.records.count(&filter).await?;
            }
            let [econcern, fb_pages, contact] = counts;
            months.push(OrmMonth {
                month: label,
                econcern,
                fb_pages,
                contact,
            });
        }
        Ok(months)
    }

    /// Counts per municipality, busiest first.
    pub async fn municipality_stats(&self, caller: &Caller) -> DocTrackResult<Vec<MunicipalityStats>> {
        let scope = policy::record_scope(caller)?;
        let mut rows = Vec::with_capacity(MUNICIPALITIES.len());
        for place in &MUNICIPALITIES {
            let base = RecordFilter::new(scope.clone()).municipality(place.name);
            rows.push(MunicipalityStats {
                name: place.name,
                latitude: place.latitude,
                longitude: place.longitude,
                total: self.records.count(&base).await?,
                pending: self
                    .records
                    .count(&base.clone().statuses(&[RecordStatus::Pending]))
                    .await?,
                approved: self
                    .records
                    .count(&base.clone().statuses(&APPROVED_LIKE))
                    .await?,
                rejected: self
                    .records
                    .count(&base.statuses(&[RecordStatus::Disapproved]))
                    .await?,
            });
        }
        rows.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(rows)
    }

    /// Records whose address mentions the named municipality.
    pub async fn municipality_records(
        &self,
        caller: &Caller,
        name: &str,
        page: u64,
    ) -> DocTrackResult<(&'static Municipality, PaginatedResult<RecordDetail>)> {
        let scope = policy::record_scope(caller)?;
        let place = municipality::find(name).ok_or_else(|| DocTrackError::NotFound {
            entity: "municipality".into(),
            id: name.to_owned(),
        })?;
        let filter = RecordFilter::new(scope).municipality(place.name);
        let page = self.records.list(&filter, Pagination::page(page)).await?;
        Ok((place, self.with_details(page).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trend_is_zero_without_history() {
        assert_eq!(trend(5, 0), 0.0);
        assert_eq!(trend(0, 0), 0.0);
    }

    #[test]
    fn trend_rounds_to_one_decimal() {
        assert_eq!(trend(15, 10), 50.0);
        assert_eq!(trend(5, 10), -50.0);
        assert_eq!(trend(4, 3), 33.3);
        assert_eq!(trend(2, 3), -33.3);
    }

    #[test]
    fn previous_month_crosses_year() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap();
        let ((cur_from, cur_before), (prev_from, prev_before)) =
            current_and_previous_month(now).unwrap();
        assert_eq!(cur_from, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(cur_before, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(prev_from, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(prev_before, cur_from);
    }

    #[test]
    fn end_of_month_still_finds_previous() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap();
        let (_, (prev_from, _)) = current_and_previous_month(now).unwrap();
        assert_eq!(prev_from, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
    }
}
