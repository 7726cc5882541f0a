//! Integration tests for sessions and the SMS credit ledger.

use chrono::{Duration, Utc};
use doctrack_core::error::DocTrackError;
use doctrack_core::models::session::CreateSession;
use doctrack_core::models::sms_transaction::{CreateSmsTransaction, SmsStatus};
use doctrack_core::models::user::{CreateUser, UpdateUser, UserRole, UserStatus};
use doctrack_core::repository::{
    Pagination, SessionRepository, SmsLedgerRepository, SmsLogFilter, UserRepository,
};
use doctrack_db::repository::{
    SurrealSessionRepository, SurrealSmsLedgerRepository, SurrealUserRepository,
};
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doctrack_db::run_migrations(&db).await.unwrap();
    db
}

async fn funded_user(db: &Surreal<Db>, credits: Decimal) -> Uuid {
    let repo = SurrealUserRepository::new(db.clone());
    let user = repo
        .create(CreateUser {
            first_name: "Ana".into(),
            middle_name: None,
            last_name: "Reyes".into(),
            extension: None,
            email: format!("{}@example.com", Uuid::new_v4()),
            password: "password123".into(),
            role: UserRole::User,
            department: Some("IT".into()),
            position: None,
            employee_id: None,
            status: UserStatus::Active,
        })
        .await
        .unwrap();
    repo.update(
        user.id,
        UpdateUser {
            sms_credits: Some(credits),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    user.id
}

fn entry(user_id: Uuid, name: &str, cost: Decimal) -> CreateSmsTransaction {
    CreateSmsTransaction {
        name: name.into(),
        credit_amount: cost,
        status: SmsStatus::Approved,
        initiated_by: "ana@example.com".into(),
        message: "Your request is ready".into(),
        recipient: "09171234567(Juan)".into(),
        user_id,
    }
}

#[tokio::test]
async fn session_lifecycle() {
    let repo = SurrealSessionRepository::new(setup().await);
    let user_id = Uuid::new_v4();
    let id = Uuid::new_v4();

    let session = repo
        .create(CreateSession {
            id,
            user_id,
            token_hash: "abc".into(),
            ip_address: Some("127.0.0.1".into()),
            user_agent: None,
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();
    assert_eq!(session.id, id);
    assert_eq!(repo.get_by_id(id).await.unwrap().token_hash, "abc");

    repo.invalidate(id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(id).await,
        Err(DocTrackError::NotFound { .. })
    ));
}

#[tokio::test]
async fn invalidate_user_sessions_and_cleanup() {
    let repo = SurrealSessionRepository::new(setup().await);
    let user_id = Uuid::new_v4();

    for (hash, offset) in [("live", 1), ("dead", -1)] {
        repo.create(CreateSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: hash.into(),
            ip_address: None,
            user_agent: None,
            expires_at: Utc::now() + Duration::hours(offset),
        })
        .await
        .unwrap();
    }
    assert_eq!(repo.cleanup_expired().await.unwrap(), 1);

    let id = Uuid::new_v4();
    repo.create(CreateSession {
        id,
        user_id,
        token_hash: "mine".into(),
        ip_address: None,
        user_agent: None,
        expires_at: Utc::now() + Duration::hours(1),
    })
    .await
    .unwrap();
    repo.invalidate_user_sessions(user_id).await.unwrap();
    assert!(repo.get_by_id(id).await.is_err());
}

#[tokio::test]
async fn charge_debits_balance_and_appends_row() {
    let db = setup().await;
    let user_id = funded_user(&db, Decimal::new(100, 2)).await;
    let ledger = SurrealSmsLedgerRepository::new(db.clone());
    let users = SurrealUserRepository::new(db);

    let tx = ledger
        .charge(
            user_id,
            Decimal::new(40, 2),
            entry(user_id, "SMSTRNSCT-032026-001", Decimal::new(40, 2)),
        )
        .await
        .unwrap();
    assert_eq!(tx.name, "SMSTRNSCT-032026-001");
    assert_eq!(tx.credit_amount, Decimal::new(40, 2));
    assert_eq!(
        users.get_by_id(user_id).await.unwrap().sms_credits,
        Decimal::new(60, 2)
    );
    assert_eq!(
        ledger.count_with_prefix("SMSTRNSCT-032026-").await.unwrap(),
        1
    );
    assert_eq!(
        ledger.count_with_prefix("SMSTRNSCT-042026-").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn overdraft_aborts_the_whole_charge() {
    let db = setup().await;
    let user_id = funded_user(&db, Decimal::new(20, 2)).await;
    let ledger = SurrealSmsLedgerRepository::new(db.clone());
    let users = SurrealUserRepository::new(db);

    let err = ledger
        .charge(
            user_id,
            Decimal::new(40, 2),
            entry(user_id, "SMSTRNSCT-032026-001", Decimal::new(40, 2)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::InsufficientCredits));

    assert_eq!(
        users.get_by_id(user_id).await.unwrap().sms_credits,
        Decimal::new(20, 2)
    );
    let logs = ledger
        .list_for_user(user_id, SmsLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(logs.total, 0);
}

#[tokio::test]
async fn logs_are_per_user_and_windowed() {
    let db = setup().await;
    let alice = funded_user(&db, Decimal::new(1000, 2)).await;
    let bob = funded_user(&db, Decimal::new(1000, 2)).await;
    let ledger = SurrealSmsLedgerRepository::new(db);

    for (user, name) in [(alice, "A-1"), (alice, "A-2"), (bob, "B-1")] {
        ledger
            .charge(user, Decimal::new(40, 2), entry(user, name, Decimal::new(40, 2)))
            .await
            .unwrap();
    }

    let mine = ledger
        .list_for_user(alice, SmsLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 2);
    assert_eq!(mine.items[0].name, "A-2");

    let future = ledger
        .list_for_user(
            alice,
            SmsLogFilter {
                from: Some(Utc::now() + Duration::hours(1)),
                before: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(future.total, 0);
}
