//! Integration tests for the receiving record workflow and dashboard
//! rollups against an in-memory database.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use doctrack_core::error::{DocTrackError, DocTrackResult};
use doctrack_core::models::receiving_record::RecordStatus;
use doctrack_core::models::user::{CreateUser, UserRole, UserStatus};
use doctrack_core::policy::Caller;
use doctrack_core::repository::UserRepository;
use doctrack_db::repository::{SurrealReceivingRecordRepository, SurrealUserRepository};
use doctrack_records::storage::RECORD_IMAGES_DIR;
use doctrack_records::store::COMPLETION_REMARK;
use doctrack_records::{
    DepartmentUpdateInput, FileStorage, LocalDiskStorage, RecordInput, RecordService, StorageConfig, Upload,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tempfile::TempDir;

type Service = RecordService<
    SurrealReceivingRecordRepository<Db>,
    SurrealUserRepository<Db>,
    LocalDiskStorage,
>;

struct Fixture {
    service: Service,
    intake: Caller,
    finance: Caller,
    vehicles: Caller,
    root: Caller,
    storage_dir: TempDir,
}

async fn user(
    repo: &SurrealUserRepository<Db>,
    email: &str,
    role: UserRole,
    department: Option<&str>,
) -> Caller {
    let user = repo
        .create(CreateUser {
            first_name: "Test".into(),
            middle_name: None,
            last_name: email.into(),
            extension: None,
            email: email.into(),
            password: "password123".into(),
            role,
            department: department.map(str::to_owned),
            position: None,
            employee_id: None,
            status: UserStatus::Active,
        })
        .await
        .unwrap();
    Caller::from(&user)
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doctrack_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let intake = user(&users, "intake@example.com", UserRole::User, Some("Receiving")).await;
    let finance = user(
        &users,
        "finance@example.com",
        UserRole::User,
        Some("Financial Assistance"),
    )
    .await;
    let vehicles = user(&users, "motorpool@example.com", UserRole::Admin, Some("Use of Vehicle")).await;
    let root = user(&users, "root@example.com", UserRole::SuperAdmin, None).await;

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = LocalDiskStorage::new(StorageConfig {
        root: storage_dir.path().to_path_buf(),
    });
    let service = RecordService::new(SurrealReceivingRecordRepository::new(db), users, storage);

    Fixture {
        service,
        intake,
        finance,
        vehicles,
        root,
        storage_dir,
    }
}

fn input(control_no: &str, department: &str, status: &str) -> RecordInput {
    RecordInput {
        control_no: Some(control_no.into()),
        date: Some("2026-03-02".into()),
        department: Some(department.into()),
        status: Some(status.into()),
        category: Some(department.into()),
        name: Some("Maria Clara".into()),
        municipality_address: Some("Brgy. San Roque, Capas".into()),
        ..Default::default()
    }
}

fn png(name: &str) -> Upload {
    Upload {
        file_name: name.into(),
        content_type: Some("image/png".into()),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    }
}

#[tokio::test]
async fn intake_creates_with_images_and_first_remark() {
    let f = setup().await;

    let detail = f
        .service
        .create(
            &f.intake,
            RecordInput {
                initial_remark: Some("Received at window 2".into()),
                ..input("CN-001", "Financial Assistance", "approved")
            },
            vec![png("front.png"), png("back.png")],
        )
        .await
        .unwrap();

    assert_eq!(detail.record.status, RecordStatus::Approved);
    assert!(detail.record.approved_at.is_some());
    assert_eq!(detail.record.remarks.as_deref(), Some("Received at window 2"));
    assert_eq!(
        detail.user.as_ref().map(|u| u.email.as_str()),
        Some("intake@example.com")
    );
    assert_eq!(detail.remarks_history.len(), 1);
    assert_eq!(detail.images.len(), 2);
    assert_eq!(detail.images[0].position, 0);
    for image in &detail.images {
        assert!(f.storage_dir.path().join(&image.file_path).exists());
    }
}

#[tokio::test]
async fn create_is_reserved_for_the_intake_desk() {
    let f = setup().await;
    let err = f
        .service
        .create(&f.finance, input("CN-002", "Financial Assistance", "pending"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::AuthorizationDenied { .. }));

    // Super admins pass every gate.
    f.service
        .create(&f.root, input("CN-002", "Financial Assistance", "pending"), vec![])
        .await
        .unwrap();
}

#[tokio::test]
async fn create_reports_every_invalid_field() {
    let f = setup().await;
    let err = f
        .service
        .create(
            &f.intake,
            RecordInput {
                control_no: None,
                date: Some("03/02/2026".into()),
                status: Some("completed".into()),
                amount_approved: Some("lots".into()),
                ..input("x", "IT", "pending")
            },
            vec![Upload {
                file_name: "notes.exe".into(),
                content_type: None,
                bytes: vec![1],
            }],
        )
        .await
        .unwrap_err();

    let DocTrackError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    for field in ["control_no", "date", "status", "amount_approved", "images.0"] {
        assert!(errors.contains(field), "missing error for {field}");
    }
}

#[tokio::test]
async fn duplicate_control_number_conflicts() {
    let f = setup().await;
    f.service
        .create(&f.intake, input("CN-010", "IT", "pending"), vec![])
        .await
        .unwrap();
    let err = f
        .service
        .create(&f.intake, input("CN-010", "IT", "pending"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::AlreadyExists { .. }));
}

#[tokio::test]
async fn department_views_are_scoped() {
    let f = setup().await;
    let theirs = f
        .service
        .create(&f.intake, input("CN-020", "Use of Vehicle", "pending"), vec![])
        .await
        .unwrap();
    f.service
        .create(&f.intake, input("CN-021", "financial assistance", "pending"), vec![])
        .await
        .unwrap();

    let mine = f.service.list_department(&f.finance, None, 1).await.unwrap();
    assert_eq!(mine.total, 1);
    assert_eq!(mine.items[0].record.control_no, "CN-021");

    let err = f
        .service
        .show_department(&f.finance, theirs.record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::NotFound { .. }));

    let everything = f.service.list_department(&f.intake, None, 1).await.unwrap();
    assert_eq!(everything.total, 2);
}

#[tokio::test]
async fn receiving_category_is_the_master_list_for_intake() {
    let f = setup().await;
    f.service
        .create(&f.intake, input("CN-030", "IT", "pending"), vec![])
        .await
        .unwrap();
    f.service
        .create(&f.intake, input("CN-031", "Use of Vehicle", "pending"), vec![])
        .await
        .unwrap();

    let master = f
        .service
        .list_department(&f.intake, Some("Receiving"), 1)
        .await
        .unwrap();
    assert_eq!(master.total, 2);

    let filtered = f
        .service
        .list_department(&f.intake, Some("IT"), 1)
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
}

#[tokio::test]
async fn processing_department_cannot_reroute_or_change_status() {
    let f = setup().await;
    let record = f
        .service
        .create(&f.intake, input("CN-040", "Financial Assistance", "pending"), vec![])
        .await
        .unwrap()
        .record;

    let err = f
        .service
        .update_department(
            &f.finance,
            record.id,
            DepartmentUpdateInput {
                department: Some("IT".into()),
                district: Some("District 2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::CrossDepartmentAssignment));
    let unchanged = f.service.show_department(&f.finance, record.id).await.unwrap();
    assert!(unchanged.record.district.is_none());

    let updated = f
        .service
        .update_department(
            &f.finance,
            record.id,
            DepartmentUpdateInput {
                status: Some("approved".into()),
                category: Some("Other Request".into()),
                control_no: Some("CN-HIJACK".into()),
                district: Some("District 2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.record.status, RecordStatus::Pending);
    assert_eq!(updated.record.category.as_deref(), Some("Financial Assistance"));
    assert_eq!(updated.record.control_no, "CN-040");
    assert_eq!(updated.record.district.as_deref(), Some("District 2"));
    // Sending a status still marks the record as processed.
    assert_eq!(updated.record.processed_by_user_id, Some(f.finance.user_id));
}

#[tokio::test]
async fn new_remark_is_appended_and_denormalized() {
    let f = setup().await;
    let record = f
        .service
        .create(&f.intake, input("CN-050", "Financial Assistance", "pending"), vec![])
        .await
        .unwrap()
        .record;

    for remark in ["Documents incomplete", "Documents complete"] {
        f.service
            .update_department(
                &f.finance,
                record.id,
                DepartmentUpdateInput {
                    new_remark: Some(remark.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let detail = f.service.show_department(&f.finance, record.id).await.unwrap();
    assert_eq!(detail.record.remarks.as_deref(), Some("Documents complete"));
    let history: Vec<&str> = detail
        .remarks_history
        .iter()
        .map(|e| e.remark.remark.as_str())
        .collect();
    assert_eq!(history, ["Documents incomplete", "Documents complete"]);
    assert_eq!(
        detail.processed_by.map(|u| u.email),
        Some("finance@example.com".to_string())
    );
    assert!(detail.record.processed_at.is_some());
}

#[tokio::test]
async fn approval_is_stamped_once() {
    let f = setup().await;
    let record = f
        .service
        .create(&f.intake, input("CN-060", "IT", "pending"), vec![])
        .await
        .unwrap()
        .record;
    assert!(record.approved_at.is_none());

    let status = |s: &str| DepartmentUpdateInput {
        status: Some(s.into()),
        ..Default::default()
    };

    let first = f
        .service
        .update_department(&f.intake, record.id, status("approved"))
        .await
        .unwrap();
    let stamped = first.record.approved_at.expect("approval stamp");

    f.service
        .update_department(&f.intake, record.id, status("served"))
        .await
        .unwrap();
    let again = f
        .service
        .update_department(&f.intake, record.id, status("approved"))
        .await
        .unwrap();
    assert_eq!(again.record.approved_at, Some(stamped));

    let err = f
        .service
        .update_department(&f.intake, record.id, status("completed"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::Validation(_)));
}

#[tokio::test]
async fn completion_requires_a_decision() {
    let f = setup().await;
    let record = f
        .service
        .create(&f.intake, input("CN-070", "IT", "on process"), vec![])
        .await
        .unwrap()
        .record;

    let err = f
        .service
        .mark_completed(&f.intake, record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::InvalidTransition { .. }));
    let untouched = f.service.show_intake(&f.intake, record.id).await.unwrap();
    assert_eq!(untouched.record.status, RecordStatus::OnProcess);
    assert!(untouched.remarks_history.is_empty());

    f.service
        .update_department(
            &f.intake,
            record.id,
            DepartmentUpdateInput {
                status: Some("disapproved".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let done = f.service.mark_completed(&f.intake, record.id).await.unwrap();
    assert_eq!(done.record.status, RecordStatus::Completed);
    assert_eq!(
        done.remarks_history.last().map(|e| e.remark.remark.as_str()),
        Some(COMPLETION_REMARK)
    );

    let err = f
        .service
        .mark_completed(&f.finance, record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn delete_removes_rows_and_files() {
    let f = setup().await;
    let detail = f
        .service
        .create(
            &f.intake,
            RecordInput {
                initial_remark: Some("scan attached".into()),
                ..input("CN-080", "IT", "pending")
            },
            vec![png("scan.png")],
        )
        .await
        .unwrap();
    let file = f.storage_dir.path().join(&detail.images[0].file_path);
    assert!(file.exists());

    f.service.delete(&f.intake, detail.record.id).await.unwrap();
    assert!(!file.exists());
    assert!(matches!(
        f.service.show_intake(&f.intake, detail.record.id).await,
        Err(DocTrackError::NotFound { .. })
    ));
}

#[tokio::test]
async fn statistics_count_within_scope() {
    let f = setup().await;
    for (no, dept, status) in [
        ("CN-090", "Use of Vehicle", "pending"),
        ("CN-091", "Use of Vehicle", "approved"),
        ("CN-092", "IT", "approved"),
    ] {
        f.service
            .create(&f.intake, input(no, dept, status), vec![])
            .await
            .unwrap();
    }

    let stats = f.service.statistics(&f.vehicles).await.unwrap();
    assert_eq!(stats.statistics.total, 2);
    assert_eq!(stats.statistics.pending, 1);
    assert_eq!(stats.statistics.approved, 1);
    assert_eq!(stats.statistics.unprocessed, 2);
    assert_eq!(stats.category_counts.get("Use of Vehicle"), Some(&2));

    let all = f.service.statistics(&f.intake).await.unwrap();
    assert_eq!(all.statistics.total, 3);
}

#[tokio::test]
async fn quick_stats_and_geography() {
    let f = setup().await;
    for (no, address, status) in [
        ("CN-100", "Brgy. Cristo Rey, Capas", "pending"),
        ("CN-101", "capas, tarlac", "approved"),
        ("CN-102", "Poblacion, Bamban", "disapproved"),
    ] {
        f.service
            .create(
                &f.intake,
                RecordInput {
                    municipality_address: Some(address.into()),
                    ..input(no, "IT", status)
                },
                vec![],
            )
            .await
            .unwrap();
    }

    let stats = f.service.quick_stats(&f.intake).await.unwrap();
    assert_eq!(stats.total_incoming, 3);
    assert_eq!(stats.total_outgoing, 1);
    assert_eq!(stats.pending_action, 1);
    assert_eq!(stats.incoming_trend, 0.0);

    let places = f.service.municipality_stats(&f.intake).await.unwrap();
    assert_eq!(places.len(), 18);
    assert_eq!(places[0].name, "Capas");
    assert_eq!((places[0].total, places[0].pending, places[0].approved), (2, 1, 1));
    assert_eq!(places[1].name, "Bamban");
    assert_eq!(places[1].rejected, 1);

    let (place, page) = f
        .service
        .municipality_records(&f.intake, "capas", 1)
        .await
        .unwrap();
    assert_eq!(place.name, "Capas");
    assert_eq!(page.total, 2);

    assert!(matches!(
        f.service.municipality_records(&f.intake, "Atlantis", 1).await,
        Err(DocTrackError::NotFound { .. })
    ));

    // Other departments only see their own records.
    let scoped = f.service.quick_stats(&f.finance).await.unwrap();
    assert_eq!(scoped.total_incoming, 0);
}

#[tokio::test]
async fn orm_counts_are_global() {
    let f = setup().await;
    f.service
        .create(
            &f.intake,
            RecordInput {
                category: Some("FB Pages".into()),
                ..input("CN-110", "IT", "pending")
            },
            vec![],
        )
        .await
        .unwrap();

    let months = f.service.orm_analytics().await.unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months.iter().map(|m| m.fb_pages).sum::<u64>(), 1);

    let scoped = f.service.quick_stats(&f.finance).await.unwrap();
    assert_eq!(scoped.orm_submissions, 1);

    let incoming = f.service.incoming_analytics(&f.intake).await.unwrap();
    assert_eq!(incoming.len(), 7);
    assert!(incoming.iter().all(|c| c.pending == 0));
}

/// Disk storage that refuses every write after the first `allowed`.
struct FailingStorage {
    inner: LocalDiskStorage,
    allowed: usize,
    puts: AtomicUsize,
}

impl FileStorage for FailingStorage {
    async fn put(&self, dir: &str, upload: &Upload) -> DocTrackResult<String> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(DocTrackError::Storage("disk full".into()));
        }
        self.inner.put(dir, upload).await
    }

    async fn delete(&self, path: &str) -> DocTrackResult<()> {
        self.inner.delete(path).await
    }
}

fn stored_images(root: &Path) -> usize {
    std::fs::read_dir(root.join(RECORD_IMAGES_DIR))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn failed_image_write_leaves_nothing_behind() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doctrack_db::run_migrations(&db).await.unwrap();
    let users = SurrealUserRepository::new(db.clone());
    let intake = user(&users, "intake@example.com", UserRole::User, Some("Receiving")).await;

    let dir = tempfile::tempdir().unwrap();
    let disk = || {
        LocalDiskStorage::new(StorageConfig {
            root: dir.path().to_path_buf(),
        })
    };
    let failing = RecordService::new(
        SurrealReceivingRecordRepository::new(db.clone()),
        users.clone(),
        FailingStorage {
            inner: disk(),
            allowed: 1,
            puts: AtomicUsize::new(0),
        },
    );

    let err = failing
        .create(
            &intake,
            input("CN-900", "IT", "pending"),
            vec![png("front.png"), png("back.png")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::Storage(_)));
    assert_eq!(stored_images(dir.path()), 0);

    let healthy = RecordService::new(SurrealReceivingRecordRepository::new(db), users, disk());
    assert_eq!(healthy.list_intake(&intake, 1).await.unwrap().total, 0);
    let detail = healthy
        .create(&intake, input("CN-900", "IT", "pending"), vec![png("front.png")])
        .await
        .unwrap();
    assert_eq!(detail.images.len(), 1);
    assert_eq!(stored_images(dir.path()), 1);
}

#[tokio::test]
async fn overlong_fields_are_reported_by_request_name() {
    let f = setup().await;
    let err = f
        .service
        .create(
            &f.intake,
            RecordInput {
                control_no: Some("  ".into()),
                record_type: Some("t".repeat(256)),
                district: Some("d".repeat(256)),
                ..input("CN-030", "IT", "pending")
            },
            vec![],
        )
        .await
        .unwrap_err();

    let DocTrackError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(
        errors.get("control_no").unwrap(),
        ["The control no field is required.".to_string()]
    );
    assert_eq!(
        errors.get("district").unwrap(),
        ["The district may not be greater than 255 characters.".to_string()]
    );
    assert!(errors.contains("type"));
    assert!(!errors.contains("record_type"));
}
