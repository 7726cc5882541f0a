//! Integration tests for outgoing documents.

use doctrack_core::error::DocTrackError;
use doctrack_core::models::outgoing_record::OutgoingCategory;
use doctrack_core::models::user::{CreateUser, UserRole, UserStatus};
use doctrack_core::policy::Caller;
use doctrack_core::repository::UserRepository;
use doctrack_db::repository::{SurrealOutgoingRecordRepository, SurrealUserRepository};
use doctrack_records::storage::MAX_DOCUMENT_BYTES;
use doctrack_records::{
    LocalDiskStorage, OutgoingInput, OutgoingQuery, OutgoingService, StorageConfig, Upload,
};
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tempfile::TempDir;

type Service = OutgoingService<
    SurrealOutgoingRecordRepository<Db>,
    SurrealUserRepository<Db>,
    LocalDiskStorage,
>;

async fn setup() -> (Service, Caller, TempDir) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doctrack_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let clerk = users
        .create(CreateUser {
            first_name: "Nestor".into(),
            middle_name: None,
            last_name: "Cruz".into(),
            extension: None,
            email: "nestor@example.com".into(),
            password: "password123".into(),
            role: UserRole::User,
            department: Some("Use of Vehicle".into()),
            position: Some("Dispatcher".into()),
            employee_id: None,
            status: UserStatus::Active,
        })
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalDiskStorage::new(StorageConfig {
        root: dir.path().to_path_buf(),
    });
    let service = OutgoingService::new(SurrealOutgoingRecordRepository::new(db), users, storage);
    (service, Caller::from(&clerk), dir)
}

fn fuel_request(driver: &str) -> OutgoingInput {
    OutgoingInput {
        category: Some("fuel_requests".into()),
        date: Some("2026-04-01".into()),
        vehicle: Some("Ambulance 2".into()),
        driver: Some(driver.into()),
        amount: Some("1500.75".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_with_attachment_then_delete() {
    let (service, caller, dir) = setup().await;

    let detail = service
        .create(
            &caller,
            fuel_request("Pedro"),
            Some(Upload {
                file_name: "trip-ticket.pdf".into(),
                content_type: Some("application/pdf".into()),
                bytes: b"%PDF-1.7".to_vec(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(detail.record.category, OutgoingCategory::FuelRequests);
    assert_eq!(detail.record.amount, Some(Decimal::new(150075, 2)));
    assert_eq!(
        detail.user.as_ref().map(|u| u.first_name.as_str()),
        Some("Nestor")
    );
    let path = detail.record.file_path.clone().expect("stored attachment");
    assert!(path.starts_with("outgoing-docs/"));
    assert!(dir.path().join(&path).exists());

    service.delete(&caller, detail.record.id).await.unwrap();
    assert!(!dir.path().join(&path).exists());
    assert!(matches!(
        service.show(&caller, detail.record.id).await,
        Err(DocTrackError::NotFound { .. })
    ));
}

#[tokio::test]
async fn validation_covers_category_date_and_file_size() {
    let (service, caller, _dir) = setup().await;

    let err = service
        .create(
            &caller,
            OutgoingInput {
                category: Some("invoice".into()),
                date: None,
                ..Default::default()
            },
            Some(Upload {
                file_name: "huge.bin".into(),
                content_type: None,
                bytes: vec![0; MAX_DOCUMENT_BYTES + 1],
            }),
        )
        .await
        .unwrap_err();

    let DocTrackError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.contains("category"));
    assert!(errors.contains("date"));
    assert!(errors.contains("file"));
}

#[tokio::test]
async fn list_filters_by_category_and_search() {
    let (service, caller, _dir) = setup().await;
    service
        .create(&caller, fuel_request("Pedro Santos"), None)
        .await
        .unwrap();
    service
        .create(&caller, fuel_request("Jose Rizal"), None)
        .await
        .unwrap();
    service
        .create(
            &caller,
            OutgoingInput {
                category: Some("memo".into()),
                date: Some("2026-04-02".into()),
                particulars: Some("Office closure on Holy Week".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let memos = service
        .list(
            &caller,
            OutgoingQuery {
                category: Some("memo".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(memos.total, 1);

    let found = service
        .list(
            &caller,
            OutgoingQuery {
                search: Some("rizal".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].record.driver.as_deref(), Some("Jose Rizal"));

    let everything = service.list(&caller, OutgoingQuery::default()).await.unwrap();
    assert_eq!(everything.total, 3);
    assert_eq!(everything.items[0].record.category, OutgoingCategory::Memo);

    let err = service
        .list(
            &caller,
            OutgoingQuery {
                category: Some("receipts".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::Validation(_)));
}
