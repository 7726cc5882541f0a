//! Outgoing documents: legal documents, memos and fuel requests.

use std::collections::HashMap;

use doctrack_core::error::{DocTrackError, DocTrackResult, FieldErrors};
use doctrack_core::models::outgoing_record::{
    CreateOutgoingRecord, OutgoingCategory, OutgoingDetail, OutgoingRecord,
};
use doctrack_core::models::user::UserSummary;
use doctrack_core::policy::{AccessRule, Caller};
use doctrack_core::repository::{
    OutgoingFilter, OutgoingRecordRepository, PaginatedResult, Pagination, UserRepository,
};
use doctrack_core::validation::{self as v, string_or_number};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::storage::{FileStorage, OUTGOING_DOCS_DIR, Upload};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct OutgoingInput {
    #[validate(required)]
    pub category: Option<String>,
    #[validate(required)]
    pub date: Option<String>,
    #[validate(length(max = 65535))]
    pub particulars: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub record_type: Option<String>,
    #[validate(length(max = 255))]
    pub recipient: Option<String>,
    #[validate(length(max = 255))]
    pub vehicle: Option<String>,
    #[validate(length(max = 255))]
    pub driver: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: Option<String>,
}

impl OutgoingInput {
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.category,
            &mut self.date,
            &mut self.particulars,
            &mut self.record_type,
            &mut self.recipient,
            &mut self.vehicle,
            &mut self.driver,
            &mut self.amount,
        ] {
            v::trim(field);
        }
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutgoingQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
}

pub struct OutgoingService<O, U, F>
where
    O: OutgoingRecordRepository,
    U: UserRepository,
    F: FileStorage,
{
    records: O,
    users: U,
    storage: F,
}

impl<O, U, F> OutgoingService<O, U, F>
where
    O: OutgoingRecordRepository,
    U: UserRepository,
    F: FileStorage,
{
    pub fn new(records: O, users: U, storage: F) -> Self {
        Self {
            records,
            users,
            storage,
        }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        query: OutgoingQuery,
    ) -> DocTrackResult<PaginatedResult<OutgoingDetail>> {
        AccessRule::AUTHENTICATED.check(caller)?;

        let mut errors = FieldErrors::new();
        let category = v::one_of(
            &mut errors,
            "category",
            query.category.as_deref(),
            OutgoingCategory::parse,
        );
        errors.into_result()?;

        let filter = OutgoingFilter {
            category,
            search: v::non_blank(query.search.as_deref()),
        };
        let page = self
            .records
            .list(filter, Pagination::page(query.page.unwrap_or(1)))
            .await?;

        let PaginatedResult {
            items,
            total,
            offset,
            limit,
        } = page;
        Ok(PaginatedResult {
            items: self.details(items).await?,
            total,
            offset,
            limit,
        })
    }

    /// File an outgoing document with an optional attachment.
    pub async fn create(
        &self,
        caller: &Caller,
        input: OutgoingInput,
        file: Option<Upload>,
    ) -> DocTrackResult<OutgoingDetail> {
        AccessRule::AUTHENTICATED.check(caller)?;

        let input = input.normalized();
        let mut errors = FieldErrors::new();
        v::collect(&mut errors, input.validate());
        let category = v::one_of(
            &mut errors,
            "category",
            input.category.as_deref(),
            OutgoingCategory::parse,
        );
        let date = v::optional_date(&mut errors, "date", input.date.as_deref());
        let amount = v::decimal(&mut errors, "amount", input.amount.as_deref());
        if let Some(file) = &file {
            file.check_document(&mut errors, "file");
        }
        errors.rename("record_type", "type");
        errors.into_result()?;

        let (Some(category), Some(date)) = (category, date) else {
            return Err(DocTrackError::Internal("validated fields missing".into()));
        };
        let OutgoingInput {
            particulars,
            record_type,
            recipient,
            vehicle,
            driver,
            ..
        } = input;

        let file_path = match &file {
            Some(upload) => Some(self.storage.put(OUTGOING_DOCS_DIR, upload).await?),
            None => None,
        };

        let created = self
            .records
            .create(CreateOutgoingRecord {
                category,
                date,
                particulars,
                record_type,
                recipient,
                vehicle,
                driver,
                amount,
                file_path: file_path.clone(),
                user_id: caller.user_id,
            })
            .await;

        let record = match created {
            Ok(record) => record,
            Err(e) => {
                if let Some(path) = file_path {
                    self.discard_file(&path).await;
                }
                return Err(e);
            }
        };

        info!(
            record_id = %record.id,
            category = record.category.as_str(),
            "Outgoing record created"
        );
        self.detail(record).await
    }

    pub async fn show(&self, caller: &Caller, id: Uuid) -> DocTrackResult<OutgoingDetail> {
        AccessRule::AUTHENTICATED.check(caller)?;
        let record = self.records.get_by_id(id).await?;
        self.detail(record).await
    }

    /// Delete the record and its stored attachment.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> DocTrackResult<()> {
        AccessRule::AUTHENTICATED.check(caller)?;
        let record = self.records.get_by_id(id).await?;
        self.records.delete(id).await?;
        if let Some(path) = record.file_path {
            self.discard_file(&path).await;
        }
        info!(record_id = %id, "Outgoing record deleted");
        Ok(())
    }

    async fn discard_file(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            warn!(path = %path, error = %e, "Failed to remove stored attachment");
        }
    }

    async fn detail(&self, record: OutgoingRecord) -> DocTrackResult<OutgoingDetail> {
        self.details(vec![record])
            .await?
            .pop()
            .ok_or_else(|| DocTrackError::Internal("outgoing detail missing".into()))
    }

    async fn details(&self, records: Vec<OutgoingRecord>) -> DocTrackResult<Vec<OutgoingDetail>> {
        let mut ids: Vec<Uuid> = records.iter().map(|r| r.user_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let users: HashMap<Uuid, UserSummary> = self
            .users
            .get_many(&ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| OutgoingDetail {
                user: users.get(&record.user_id).cloned(),
                record,
            })
            .collect())
    }
}
