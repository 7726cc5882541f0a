//! Receiving record workflow: intake, department processing, completion
//! and removal.
//!
//! Intake endpoints are reserved for the intake desk and see every
//! record. Department endpoints are scoped through
//! [`policy::record_scope`], so a record outside the caller's department
//! is reported as not found.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use doctrack_core::error::{DocTrackError, DocTrackResult, FieldErrors};
use doctrack_core::models::document_image::CreateDocumentImage;
use doctrack_core::models::receiving_record::{
    CreateReceivingRecord, ReceivingRecord, RecordDetail, RecordStatus, RemarkEntry,
    UpdateReceivingRecord,
};
use doctrack_core::models::remark::CreateRecordRemark;
use doctrack_core::models::user::UserSummary;
use doctrack_core::policy::{self, AccessRule, Caller, WriteTarget};
use doctrack_core::repository::{
    PaginatedResult, Pagination, ReceivingRecordRepository, RecordFilter, RecordScope,
    UserRepository,
};
use doctrack_core::validation::{self as v, string_or_number};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::storage::{FileStorage, RECORD_IMAGES_DIR, Upload};

/// Remark appended when the intake desk closes a record.
pub const COMPLETION_REMARK: &str = "Record marked as completed.";

/// Intake form for a new receiving record. Every field arrives as text so
/// JSON and multipart bodies share one validation path.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RecordInput {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(required, length(max = 255))]
    pub control_no: Option<String>,
    #[validate(required)]
    pub date: Option<String>,
    #[validate(length(max = 65535))]
    pub particulars: Option<String>,
    #[validate(required, length(max = 255))]
    pub department: Option<String>,
    #[validate(length(max = 255))]
    pub category: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub record_type: Option<String>,
    #[validate(length(max = 255))]
    pub organization_barangay: Option<String>,
    #[validate(length(max = 255))]
    pub municipality_address: Option<String>,
    #[validate(length(max = 255))]
    pub province: Option<String>,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(max = 255))]
    pub contact: Option<String>,
    #[validate(length(max = 65535))]
    pub action_taken: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub amount_approved: Option<String>,
    #[validate(required)]
    pub status: Option<String>,
    #[validate(length(max = 255))]
    pub district: Option<String>,
    #[validate(length(max = 255))]
    pub requisitioner: Option<String>,
    #[validate(length(max = 65535))]
    pub served_request: Option<String>,
    #[validate(length(max = 65535))]
    pub remarks: Option<String>,
    /// First entry of the remark history.
    #[validate(length(max = 65535))]
    pub initial_remark: Option<String>,
}

impl RecordInput {
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.control_no,
            &mut self.date,
            &mut self.particulars,
            &mut self.department,
            &mut self.category,
            &mut self.record_type,
            &mut self.organization_barangay,
            &mut self.municipality_address,
            &mut self.province,
            &mut self.name,
            &mut self.contact,
            &mut self.action_taken,
            &mut self.amount_approved,
            &mut self.status,
            &mut self.district,
            &mut self.requisitioner,
            &mut self.served_request,
            &mut self.remarks,
            &mut self.initial_remark,
        ] {
            v::trim(field);
        }
        self
    }
}

/// Patch submitted from a department dashboard.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DepartmentUpdateInput {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(max = 255))]
    pub control_no: Option<String>,
    pub date: Option<String>,
    #[validate(length(max = 65535))]
    pub particulars: Option<String>,
    #[validate(length(max = 255))]
    pub department: Option<String>,
    #[validate(length(max = 255))]
    pub category: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(max = 255))]
    pub record_type: Option<String>,
    #[validate(length(max = 255))]
    pub organization_barangay: Option<String>,
    #[validate(length(max = 255))]
    pub municipality_address: Option<String>,
    #[validate(length(max = 255))]
    pub province: Option<String>,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(max = 255))]
    pub contact: Option<String>,
    #[validate(length(max = 65535))]
    pub action_taken: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub amount_approved: Option<String>,
    pub status: Option<String>,
    #[validate(length(max = 255))]
    pub district: Option<String>,
    #[validate(length(max = 255))]
    pub requisitioner: Option<String>,
    #[validate(length(max = 65535))]
    pub served_request: Option<String>,
    #[validate(length(max = 65535))]
    pub remarks: Option<String>,
    /// Appended to the remark history and copied into `remarks`.
    #[validate(length(max = 65535))]
    pub new_remark: Option<String>,
}

impl DepartmentUpdateInput {
    /// Whether the request touches a field that marks the record as
    /// processed by the caller.
    fn touches_processing(&self) -> bool {
        self.status.is_some()
            || self.remarks.is_some()
            || self.action_taken.is_some()
            || self.new_remark.is_some()
    }

    fn normalized(mut self) -> Self {
        for field in [
            &mut self.control_no,
            &mut self.date,
            &mut self.particulars,
            &mut self.department,
            &mut self.category,
            &mut self.record_type,
            &mut self.organization_barangay,
            &mut self.municipality_address,
            &mut self.province,
            &mut self.name,
            &mut self.contact,
            &mut self.action_taken,
            &mut self.amount_approved,
            &mut self.status,
            &mut self.district,
            &mut self.requisitioner,
            &mut self.served_request,
            &mut self.remarks,
            &mut self.new_remark,
        ] {
            v::trim(field);
        }
        self
    }

    /// Drop routing and intake fields a processing department may not
    /// change.
    fn processing_only(self) -> Self {
        Self {
            control_no: None,
            date: None,
            particulars: None,
            department: None,
            category: None,
            organization_barangay: None,
            municipality_address: None,
            province: None,
            name: None,
            contact: None,
            status: None,
            ..self
        }
    }
}

/// Per-status counts for one department scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub disapproved: u64,
    pub served: u64,
    pub on_process: u64,
    pub for_releasing: u64,
    pub completed: u64,
    pub processed: u64,
    pub unprocessed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordStatistics {
    pub statistics: StatusCounts,
    pub category_counts: BTreeMap<String, u64>,
    pub department: Option<String>,
}

fn workflow_status(errors: &mut FieldErrors, value: Option<&str>) -> Option<RecordStatus> {
    v::one_of(errors, "status", value, |s| {
        RecordStatus::parse(s).filter(RecordStatus::is_workflow)
    })
}

/// Receiving record service.
pub struct RecordService<R, U, F>
where
    R: ReceivingRecordRepository,
    U: UserRepository,
    F: FileStorage,
{
    pub(crate) records: R,
    users: U,
    storage: F,
}

impl<R, U, F> RecordService<R, U, F>
where
    R: ReceivingRecordRepository,
    U: UserRepository,
    F: FileStorage,
{
    pub fn new(records: R, users: U, storage: F) -> Self {
        Self {
            records,
            users,
            storage,
        }
    }

    // -----------------------------------------------------------------------
    // Intake desk
    // -----------------------------------------------------------------------

    /// Register a new inbound request with optional images and a first
    /// remark.
    pub async fn create(
        &self,
        caller: &Caller,
        input: RecordInput,
        images: Vec<Upload>,
    ) -> DocTrackResult<RecordDetail> {
        AccessRule::INTAKE_DESK.check(caller)?;

        let input = input.normalized();
        let mut errors = FieldErrors::new();
        v::collect(&mut errors, input.validate());
        let date = v::optional_date(&mut errors, "date", input.date.as_deref());
        let status = workflow_status(&mut errors, input.status.as_deref());
        let amount_approved = v::decimal(
            &mut errors,
            "amount_approved",
            input.amount_approved.as_deref(),
        );
        for (i, image) in images.iter().enumerate() {
            image.check_image(&mut errors, &format!("images.{i}"));
        }
        errors.rename("record_type", "type");
        errors.into_result()?;

        let (
            RecordInput {
                control_no: Some(control_no),
                department: Some(department),
                particulars,
                category,
                record_type,
                organization_barangay,
                municipality_address,
                province,
                name,
                contact,
                action_taken,
                district,
                requisitioner,
                served_request,
                remarks,
                initial_remark,
                ..
            },
            Some(date),
            Some(status),
        ) = (input, date, status)
        else {
            return Err(DocTrackError::Internal("validated fields missing".into()));
        };
        policy::ensure_department_consistency(caller, WriteTarget::Record, Some(&department))?;

        let mut stored = Vec::with_capacity(images.len());
        for image in &images {
            match self.storage.put(RECORD_IMAGES_DIR, image).await {
                Ok(path) => stored.push(path),
                Err(e) => {
                    self.discard_files(&stored).await;
                    return Err(e);
                }
            }
        }

        let now = Utc::now();
        let created = self
            .records
            .create(CreateReceivingRecord {
                control_no,
                date,
                particulars,
                department,
                category,
                record_type,
                organization_barangay,
                municipality_address,
                province,
                name,
                contact,
                action_taken,
                amount_approved,
                status,
                district,
                requisitioner,
                served_request,
                remarks: initial_remark.clone().or(remarks),
                user_id: caller.user_id,
                approved_at: (status == RecordStatus::Approved).then_some(now),
            })
            .await;
        let record = match created {
            Ok(record) => record,
            Err(e) => {
                self.discard_files(&stored).await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .attach_intake(record.id, caller.user_id, &stored, initial_remark)
            .await
        {
            error!(record_id = %record.id, error = %e, "Rolling back partially created record");
            if let Err(cleanup) = self.records.delete(record.id).await {
                error!(record_id = %record.id, error = %cleanup, "Failed to roll back record");
            }
            self.discard_files(&stored).await;
            return Err(e);
        }

        info!(
            record_id = %record.id,
            control_no = %record.control_no,
            department = %record.department,
            images = images.len(),
            "Receiving record created"
        );
        self.detail(record).await
    }

    /// The master list: every record, newest first.
    pub async fn list_intake(
        &self,
        caller: &Caller,
        page: u64,
    ) -> DocTrackResult<PaginatedResult<RecordDetail>> {
        AccessRule::INTAKE_DESK.check(caller)?;
        let page = self
            .records
            .list(&RecordFilter::new(RecordScope::All), Pagination::page(page))
            .await?;
        self.with_details(page).await
    }

    pub async fn show_intake(&self, caller: &Caller, id: Uuid) -> DocTrackResult<RecordDetail> {
        AccessRule::INTAKE_DESK.check(caller)?;
        let record = self.records.get_by_id(id, &RecordScope::All).await?;
        self.detail(record).await
    }

    /// Close a decided record. Only `approved` and `disapproved` records
    /// may be completed.
    pub async fn mark_completed(&self, caller: &Caller, id: Uuid) -> DocTrackResult<RecordDetail> {
        AccessRule::INTAKE_DESK.check(caller)?;
        let record = self.records.get_by_id(id, &RecordScope::All).await?;

        if !record.status.can_complete() {
            warn!(
                record_id = %id,
                status = %record.status,
                "Rejected completion of undecided record"
            );
            return Err(DocTrackError::InvalidTransition {
                from: record.status.to_string(),
                to: RecordStatus::Completed.to_string(),
            });
        }

        let updated = self
            .records
            .update(
                id,
                UpdateReceivingRecord {
                    status: Some(RecordStatus::Completed),
                    processed_by_user_id: Some(caller.user_id),
                    processed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        self.records
            .append_remark(CreateRecordRemark {
                receiving_record_id: id,
                user_id: caller.user_id,
                remark: COMPLETION_REMARK.into(),
            })
            .await?;

        info!(record_id = %id, by = %caller.user_id, "Receiving record completed");
        self.detail(updated).await
    }

    /// Remove a record with its remarks, image rows and stored files.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> DocTrackResult<()> {
        AccessRule::INTAKE_DESK.check(caller)?;
        let record = self.records.get_by_id(id, &RecordScope::All).await?;
        let images = self.records.list_images(id).await?;

        self.records.delete(id).await?;

        let paths: Vec<String> = images.into_iter().map(|i| i.file_path).collect();
        self.discard_files(&paths).await;

        info!(record_id = %id, control_no = %record.control_no, "Receiving record deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Department dashboard
    // -----------------------------------------------------------------------

    /// Records routed to the caller's department. The intake desk asking
    /// for category `Receiving` gets the unfiltered master list.
    pub async fn list_department(
        &self,
        caller: &Caller,
        category: Option<&str>,
        page: u64,
    ) -> DocTrackResult<PaginatedResult<RecordDetail>> {
        let mut filter = RecordFilter::new(policy::record_scope(caller)?);
        if let Some(category) = v::non_blank(category) {
            let master_list = caller.is_intake_desk() && category.eq_ignore_ascii_case("receiving");
            if !master_list {
                filter = filter.category(category);
            }
        }

        let page = self.records.list(&filter, Pagination::page(page)).await?;
        self.with_details(page).await
    }

    pub async fn show_department(&self, caller: &Caller, id: Uuid) -> DocTrackResult<RecordDetail> {
        let scope = policy::record_scope(caller)?;
        let record = self.records.get_by_id(id, &scope).await?;
        self.detail(record).await
    }

    /// Apply a department update.
    ///
    /// Callers without universal visibility may only touch processing
    /// fields; a `department` other than their own is rejected before
    /// anything is written.
    pub async fn update_department(
        &self,
        caller: &Caller,
        id: Uuid,
        input: DepartmentUpdateInput,
    ) -> DocTrackResult<RecordDetail> {
        let scope = policy::record_scope(caller)?;
        let record = self.records.get_by_id(id, &scope).await?;

        let touches_processing = input.touches_processing();
        let input = if caller.has_universal_visibility() {
            input
        } else {
            if let Some(department) = v::non_blank(input.department.as_deref()) {
                policy::ensure_department_consistency(
                    caller,
                    WriteTarget::Record,
                    Some(&department),
                )?;
            }
            debug!(record_id = %id, "Restricting update to processing fields");
            input.processing_only()
        };

        let input = input.normalized();
        let mut errors = FieldErrors::new();
        v::collect(&mut errors, input.validate());
        let status = workflow_status(&mut errors, input.status.as_deref());
        let date = v::optional_date(&mut errors, "date", input.date.as_deref());
        let amount_approved = v::decimal(
            &mut errors,
            "amount_approved",
            input.amount_approved.as_deref(),
        );
        errors.rename("record_type", "type");
        errors.into_result()?;

        let new_remark = input.new_remark;
        let mut patch = UpdateReceivingRecord {
            control_no: input.control_no,
            date,
            particulars: input.particulars,
            department: input.department,
            category: input.category,
            record_type: input.record_type,
            organization_barangay: input.organization_barangay,
            municipality_address: input.municipality_address,
            province: input.province,
            name: input.name,
            contact: input.contact,
            action_taken: input.action_taken,
            amount_approved,
            status,
            district: input.district,
            requisitioner: input.requisitioner,
            served_request: input.served_request,
            remarks: input.remarks,
            ..Default::default()
        };

        let now = Utc::now();
        if touches_processing {
            patch.processed_by_user_id = Some(caller.user_id);
            patch.processed_at = Some(now);
        }
        if new_remark.is_some() {
            patch.remarks = new_remark.clone();
        }
        let first_approval = status == Some(RecordStatus::Approved)
            && record.status != RecordStatus::Approved
            && record.approved_at.is_none();
        if first_approval {
            patch.approved_at = Some(now);
        }

        let updated = self.records.update(id, patch).await?;

        if let Some(remark) = new_remark {
            self.records
                .append_remark(CreateRecordRemark {
                    receiving_record_id: id,
                    user_id: caller.user_id,
                    remark,
                })
                .await?;
        }

        info!(
            record_id = %id,
            by = %caller.user_id,
            status = %updated.status,
            "Receiving record updated"
        );
        self.detail(updated).await
    }

    /// Counts for the department dashboard cards.
    pub async fn statistics(&self, caller: &Caller) -> DocTrackResult<RecordStatistics> {
        let scope = policy::record_scope(caller)?;
        let base = RecordFilter::new(scope);
        let by_status = |status: RecordStatus| base.clone().statuses(&[status]);

        let statistics = StatusCounts {
            total: self.records.count(&base).await?,
            pending: self.records.count(&by_status(RecordStatus::Pending)).await?,
            approved: self.records.count(&by_status(RecordStatus::Approved)).await?,
            disapproved: self.records.count(&by_status(RecordStatus::Disapproved)).await?,
            served: self.records.count(&by_status(RecordStatus::Served)).await?,
            on_process: self.records.count(&by_status(RecordStatus::OnProcess)).await?,
            for_releasing: self
                .records
                .count(&by_status(RecordStatus::ForReleasing))
                .await?,
            completed: self.records.count(&by_status(RecordStatus::Completed)).await?,
            processed: self.records.count(&base.clone().processed(true)).await?,
            unprocessed: self.records.count(&base.clone().processed(false)).await?,
        };

        let category_counts = self
            .records
            .count_by_category(&base)
            .await?
            .into_iter()
            .map(|c| (c.category, c.total))
            .collect();

        Ok(RecordStatistics {
            statistics,
            category_counts,
            department: caller.department.clone(),
        })
    }

    /// Image rows and the first remark of a freshly created record.
    async fn attach_intake(
        &self,
        record_id: Uuid,
        user_id: Uuid,
        files: &[String],
        initial_remark: Option<String>,
    ) -> DocTrackResult<()> {
        for (position, file_path) in files.iter().enumerate() {
            self.records
                .add_image(CreateDocumentImage {
                    receiving_record_id: record_id,
                    file_path: file_path.clone(),
                    position: position as u32,
                })
                .await?;
        }
        if let Some(remark) = initial_remark {
            self.records
                .append_remark(CreateRecordRemark {
                    receiving_record_id: record_id,
                    user_id,
                    remark,
                })
                .await?;
        }
        Ok(())
    }

    /// Best-effort removal of stored files.
    async fn discard_files(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.storage.delete(path).await {
                warn!(path = %path, error = %e, "Failed to remove stored image");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Eager loading
    // -----------------------------------------------------------------------

    pub(crate) async fn with_details(
        &self,
        page: PaginatedResult<ReceivingRecord>,
    ) -> DocTrackResult<PaginatedResult<RecordDetail>> {
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

    async fn detail(&self, record: ReceivingRecord) -> DocTrackResult<RecordDetail> {
        self.details(vec![record])
            .await?
            .pop()
            .ok_or_else(|| DocTrackError::Internal("record detail missing".into()))
    }

    /// Attach creator, processor, remark history and images. Users are
    /// fetched once for the whole batch.
    async fn details(&self, records: Vec<ReceivingRecord>) -> DocTrackResult<Vec<RecordDetail>> {
        let mut loaded = Vec::with_capacity(records.len());
        let mut user_ids = Vec::new();
        for record in records {
            let remarks = self.records.list_remarks(record.id).await?;
            let images = self.records.list_images(record.id).await?;
            user_ids.push(record.user_id);
            user_ids.extend(record.processed_by_user_id);
            user_ids.extend(remarks.iter().map(|r| r.user_id));
            loaded.push((record, remarks, images));
        }
        user_ids.sort_unstable();
        user_ids.dedup();

        let users: HashMap<Uuid, UserSummary> = self
            .users
            .get_many(&user_ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();
        let summary = |id: &Uuid| users.get(id).cloned();

        Ok(loaded
            .into_iter()
            .map(|(record, remarks, images)| RecordDetail {
                user: summary(&record.user_id),
                processed_by: record.processed_by_user_id.as_ref().and_then(summary),
                remarks_history: remarks
                    .into_iter()
                    .map(|remark| RemarkEntry {
                        user: summary(&remark.user_id),
                        remark,
                    })
                    .collect(),
                images,
                record,
            })
            .collect())
    }
}
