//! Integration tests for the SMS service against an in-memory database
//! and a scripted gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use doctrack_core::error::DocTrackError;
use doctrack_core::models::sms_transaction::SmsStatus;
use doctrack_core::models::user::{CreateUser, UpdateUser, UserRole, UserStatus};
use doctrack_core::policy::Caller;
use doctrack_core::repository::UserRepository;
use doctrack_db::repository::{SurrealSmsLedgerRepository, SurrealUserRepository};
use doctrack_sms::{GatewayError, GatewayResponse, LogQuery, SendSms, SmsGateway, SmsService};
use rust_decimal::Decimal;
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

#[derive(Clone)]
struct ScriptedGateway {
    configured: bool,
    accept: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedGateway {
    fn accepting() -> Self {
        Self {
            configured: true,
            accept: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SmsGateway for ScriptedGateway {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send(&self, number: &str, _message: &str) -> Result<GatewayResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayResponse {
            success: self.accept,
            status: if self.accept { 200 } else { 400 },
            body: json!({ "status": if self.accept { "sent" } else { "rejected" }, "number": number }),
        })
    }
}

type Service = SmsService<
    SurrealUserRepository<Db>,
    SurrealSmsLedgerRepository<Db>,
    ScriptedGateway,
>;

/// In-memory DB with one sender holding `credits`.
async fn seed(credits: Decimal) -> (Surreal<Db>, SurrealUserRepository<Db>, Caller) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    doctrack_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let user = users
        .create(CreateUser {
            first_name: "Lito".into(),
            middle_name: None,
            last_name: "Santos".into(),
            extension: None,
            email: "lito@example.com".into(),
            password: "password123".into(),
            role: UserRole::User,
            department: Some("Financial Assistance".into()),
            position: None,
            employee_id: None,
            status: UserStatus::Active,
        })
        .await
        .unwrap();
    let user = users
        .update(
            user.id,
            UpdateUser {
                sms_credits: Some(credits),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    (db, users, Caller::from(&user))
}

async fn setup(credits: Decimal, gateway: ScriptedGateway) -> (Service, SurrealUserRepository<Db>, Caller) {
    let (db, users, caller) = seed(credits).await;
    let service = SmsService::new(
        users.clone(),
        SurrealSmsLedgerRepository::new(db),
        gateway,
    );
    (service, users, caller)
}

fn request(message: &str) -> SendSms {
    SendSms {
        contact_number: Some("09171234567".into()),
        message: Some(message.into()),
        recipient: Some("Juan Dela Cruz".into()),
    }
}

#[tokio::test]
async fn successful_send_charges_and_logs() {
    let (service, users, caller) = setup(Decimal::new(100, 2), ScriptedGateway::accepting()).await;

    let body = service.send(&caller, request(&"x".repeat(150))).await.unwrap();
    assert_eq!(body["status"], "sent");

    assert_eq!(
        users.get_by_id(caller.user_id).await.unwrap().sms_credits,
        Decimal::new(60, 2)
    );
    assert_eq!(service.balance(&caller).await.unwrap(), Decimal::new(60, 2));

    let logs = service.logs(&caller, LogQuery::default()).await.unwrap();
    assert_eq!(logs.total, 1);
    let tx = &logs.items[0];
    assert_eq!(tx.status, SmsStatus::Approved);
    assert_eq!(tx.recipient, "Juan Dela Cruz(09171234567)");
    assert_eq!(tx.initiated_by, "lito@example.com");
    assert!(tx.name.starts_with("SMSTRNSCT-") && tx.name.ends_with("-001"));
}

#[tokio::test]
async fn sequence_increments_within_the_month() {
    let (service, _, caller) = setup(Decimal::new(500, 2), ScriptedGateway::accepting()).await;
    service.send(&caller, request("first")).await.unwrap();
    service.send(&caller, request("second")).await.unwrap();

    let logs = service
        .logs(
            &caller,
            LogQuery {
                filter: Some("monthly".into()),
                page: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(logs.total, 2);
    assert!(logs.items[0].name.ends_with("-002"));
    assert!(logs.items[1].name.ends_with("-001"));
}

#[tokio::test]
async fn insufficient_credits_skip_the_gateway() {
    let gateway = ScriptedGateway::accepting();
    let calls = gateway.calls.clone();
    let (service, _, caller) = setup(Decimal::new(10, 2), gateway).await;

    let err = service
        .send(&caller, request(&"x".repeat(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, DocTrackError::InsufficientCredits));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.balance(&caller).await.unwrap(), Decimal::new(10, 2));
}

#[tokio::test]
async fn gateway_rejection_is_charged_and_recorded_as_failed() {
    let gateway = ScriptedGateway {
        accept: false,
        ..ScriptedGateway::accepting()
    };
    let (service, _, caller) = setup(Decimal::new(100, 2), gateway).await;

    let err = service.send(&caller, request(&"x".repeat(75))).await.unwrap_err();
    assert!(matches!(err, DocTrackError::Internal(ref m) if m.starts_with("Failed to send SMS")));

    assert_eq!(service.balance(&caller).await.unwrap(), Decimal::new(80, 2));
    let logs = service.logs(&caller, LogQuery::default()).await.unwrap();
    assert_eq!(logs.items[0].status, SmsStatus::Failed);
}

#[tokio::test]
async fn unconfigured_gateway_is_unavailable() {
    let gateway = ScriptedGateway {
        configured: false,
        ..ScriptedGateway::accepting()
    };
    let (service, _, caller) = setup(Decimal::new(100, 2), gateway).await;

    let err = service.send(&caller, request("hello")).await.unwrap_err();
    assert!(matches!(err, DocTrackError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let (service, _, caller) = setup(Decimal::new(100, 2), ScriptedGateway::accepting()).await;

    let err = service
        .send(
            &caller,
            SendSms {
                contact_number: Some("  ".into()),
                message: None,
                recipient: Some("Juan".into()),
            },
        )
        .await
        .unwrap_err();
    let DocTrackError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.contains("contact_number"));
    assert!(errors.contains("message"));
    assert!(!errors.contains("recipient"));
}

#[tokio::test]
async fn unknown_log_filter_lists_everything() {
    let (service, _, caller) = setup(Decimal::new(100, 2), ScriptedGateway::accepting()).await;
    service.send(&caller, request("hello")).await.unwrap();

    let logs = service
        .logs(
            &caller,
            LogQuery {
                filter: Some("all".into()),
                page: Some(1),
            },
        )
        .await
        .unwrap();
    assert_eq!(logs.total, 1);
}

/// Accepts the message but spends the sender's credits while it is in
/// flight, as a concurrent send would.
struct DrainingGateway {
    users: SurrealUserRepository<Db>,
    user_id: Uuid,
}

impl SmsGateway for DrainingGateway {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, _number: &str, _message: &str) -> Result<GatewayResponse, GatewayError> {
        self.users
            .update(
                self.user_id,
                UpdateUser {
                    sms_credits: Some(Decimal::ZERO),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        Ok(GatewayResponse {
            success: true,
            status: 200,
            body: json!({ "status": "sent" }),
        })
    }
}

#[tokio::test]
async fn credits_spent_mid_send_fail_the_charge() {
    let (db, users, caller) = seed(Decimal::new(100, 2)).await;
    let service = SmsService::new(
        users.clone(),
        SurrealSmsLedgerRepository::new(db),
        DrainingGateway {
            users: users.clone(),
            user_id: caller.user_id,
        },
    );

    let err = service.send(&caller, request("hello")).await.unwrap_err();
    assert!(matches!(err, DocTrackError::InsufficientCredits));

    assert_eq!(
        users.get_by_id(caller.user_id).await.unwrap().sms_credits,
        Decimal::ZERO
    );
    let logs = service
        .logs(
            &caller,
            LogQuery {
                filter: Some("all".into()),
                page: Some(1),
            },
        )
        .await
        .unwrap();
    assert_eq!(logs.total, 0);
}
