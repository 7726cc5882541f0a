//! Integration tests for the User repository using in-memory SurrealDB.

use doctrack_core::error::DocTrackError;
use doctrack_core::models::user::{CreateUser, UpdateUser, UserRole, UserStatus};
use doctrack_core::repository::{Pagination, UserFilter, UserRepository};
use doctrack_db::repository::SurrealUserRepository;
use doctrack_db::verify_password;
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doctrack_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(email: &str, department: Option<&str>, role: UserRole) -> CreateUser {
    CreateUser {
        first_name: "Maria".into(),
        middle_name: None,
        last_name: "Santos".into(),
        extension: None,
        email: email.into(),
        password: "correct-horse".into(),
        role,
        department: department.map(str::to_owned),
        position: Some("Clerk".into()),
        employee_id: None,
        status: UserStatus::Active,
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = SurrealUserRepository::new(setup().await);

    let user = repo
        .create(new_user("maria@example.com", Some("Receiving"), UserRole::User))
        .await
        .unwrap();

    assert_eq!(user.email, "maria@example.com");
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(user.department.as_deref(), Some("Receiving"));
    assert_eq!(user.sms_credits, Decimal::ZERO);
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(verify_password("correct-horse", &user.password_hash, None).unwrap());
    assert!(!verify_password("wrong", &user.password_hash, None).unwrap());

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    let by_email = repo.get_by_email("maria@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("dup@example.com", None, UserRole::User))
        .await
        .unwrap();

    let err = repo
        .create(new_user("dup@example.com", None, UserRole::Admin))
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::AlreadyExists { .. }));
}

#[tokio::test]
async fn pepper_changes_verification() {
    let repo = SurrealUserRepository::with_pepper(setup().await, "pepper".into());
    let user = repo
        .create(new_user("pep@example.com", None, UserRole::User))
        .await
        .unwrap();

    assert!(verify_password("correct-horse", &user.password_hash, Some("pepper")).unwrap());
    assert!(!verify_password("correct-horse", &user.password_hash, None).unwrap());
}

#[tokio::test]
async fn update_rehashes_password_and_sets_credits() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("upd@example.com", Some("IT"), UserRole::User))
        .await
        .unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                password: Some("new-password".into()),
                sms_credits: Some(Decimal::new(1050, 2)),
                status: Some(UserStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.sms_credits, Decimal::new(1050, 2));
    assert_eq!(updated.status, UserStatus::Inactive);
    assert_eq!(updated.first_name, "Maria");
    assert!(verify_password("new-password", &updated.password_hash, None).unwrap());
}

#[tokio::test]
async fn update_missing_user_is_not_found() {
    let repo = SurrealUserRepository::new(setup().await);
    let err = repo
        .update(uuid::Uuid::new_v4(), UpdateUser::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::NotFound { .. }));
}

#[tokio::test]
async fn negative_credits_are_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("neg@example.com", None, UserRole::User))
        .await
        .unwrap();

    let result = repo
        .update(
            user.id,
            UpdateUser {
                sms_credits: Some(Decimal::new(-1, 0)),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());
    assert_eq!(
        repo.get_by_id(user.id).await.unwrap().sms_credits,
        Decimal::ZERO
    );
}

#[tokio::test]
async fn delete_removes_user() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("gone@example.com", None, UserRole::User))
        .await
        .unwrap();

    repo.delete(user.id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(user.id).await,
        Err(DocTrackError::NotFound { .. })
    ));
}

#[tokio::test]
async fn list_filters_by_department_role_and_search() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("a@example.com", Some("IT"), UserRole::Admin))
        .await
        .unwrap();
    repo.create(new_user("b@example.com", Some("it"), UserRole::User))
        .await
        .unwrap();
    let mut other = new_user("c@example.com", Some("Receiving"), UserRole::User);
    other.first_name = "Jose".into();
    other.last_name = "Rizal".into();
    repo.create(other).await.unwrap();

    let it = repo
        .list(
            UserFilter {
                department: Some("IT".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(it.total, 2);

    let admins = repo
        .list(
            UserFilter {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(admins.total, 1);
    assert_eq!(admins.items[0].email, "a@example.com");

    let rizal = repo
        .list(
            UserFilter {
                search: Some("RIZ".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(rizal.total, 1);
    assert_eq!(rizal.items[0].email, "c@example.com");

    let all = repo
        .list(UserFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    // Newest first.
    assert_eq!(all.items[0].email, "c@example.com");
}

#[tokio::test]
async fn get_many_skips_unknown_ids() {
    let repo = SurrealUserRepository::new(setup().await);
    let a = repo
        .create(new_user("m1@example.com", None, UserRole::User))
        .await
        .unwrap();
    let b = repo
        .create(new_user("m2@example.com", None, UserRole::User))
        .await
        .unwrap();

    let users = repo
        .get_many(&[a.id, b.id, uuid::Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
    assert!(repo.get_many(&[]).await.unwrap().is_empty());
}
