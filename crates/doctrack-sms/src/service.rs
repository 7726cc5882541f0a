//! SMS service: send with credit accounting, balance and history.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use doctrack_core::error::{DocTrackError, DocTrackResult, FieldErrors};
use doctrack_core::models::sms_transaction::{
    CreateSmsTransaction, SmsStatus, SmsTransaction, month_prefix, transaction_name,
};
use doctrack_core::policy::{AccessRule, Caller};
use doctrack_core::repository::{
    PaginatedResult, Pagination, SmsLedgerRepository, SmsLogFilter, UserRepository,
};
use doctrack_core::validation;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use validator::Validate;

use crate::cost::message_cost;
use crate::gateway::SmsGateway;

const SEND_FAILED: &str = "Failed to send SMS. Please contact your admin.";

/// Send request body.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SendSms {
    #[validate(required)]
    pub contact_number: Option<String>,
    #[validate(required)]
    pub message: Option<String>,
    /// Display label for the person being texted.
    #[validate(required)]
    pub recipient: Option<String>,
}

/// History query. `filter` is `daily` (default), `weekly` or `monthly`;
/// any other value disables date filtering.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub filter: Option<String>,
    pub page: Option<u64>,
}

/// Date window for a log filter, evaluated at `now`.
pub fn log_window(filter: Option<&str>, now: DateTime<Utc>) -> SmsLogFilter {
    let today = now.date_naive();
    let (from, before) = match filter.unwrap_or("daily") {
        "daily" => (today, today + Days::new(1)),
        "weekly" => {
            let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
            (monday, monday + Days::new(7))
        }
        "monthly" => {
            let first = today.with_day(1).unwrap_or(today);
            let next = first
                .checked_add_months(Months::new(1))
                .unwrap_or(first + Days::new(31));
            (first, next)
        }
        _ => return SmsLogFilter::default(),
    };
    SmsLogFilter {
        from: Some(start_of(from)),
        before: Some(start_of(before)),
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Credit-metered SMS sending.
pub struct SmsService<U: UserRepository, L: SmsLedgerRepository, G: SmsGateway> {
    user_repo: U,
    ledger: L,
    gateway: G,
}

impl<U, L, G> SmsService<U, L, G>
where
    U: UserRepository,
    L: SmsLedgerRepository,
    G: SmsGateway,
{
    pub fn new(user_repo: U, ledger: L, gateway: G) -> Self {
        Self {
            user_repo,
            ledger,
            gateway,
        }
    }

    /// Send one message and charge the caller for it.
    ///
    /// A gateway rejection is still charged and recorded as `Failed`.
    pub async fn send(&self, caller: &Caller, mut input: SendSms) -> DocTrackResult<Value> {
        AccessRule::AUTHENTICATED.check(caller)?;

        for field in [
            &mut input.contact_number,
            &mut input.message,
            &mut input.recipient,
        ] {
            validation::trim(field);
        }
        let mut errors = FieldErrors::new();
        validation::collect(&mut errors, input.validate());
        errors.into_result()?;
        let SendSms {
            contact_number: Some(number),
            message: Some(message),
            recipient: Some(recipient),
        } = input
        else {
            return Err(DocTrackError::Internal("validated fields missing".into()));
        };

        if !self.gateway.is_configured() {
            error!("SMS send attempted without gateway configuration");
            return Err(DocTrackError::ServiceUnavailable(
                "SMS Service is not configured.".into(),
            ));
        }

        let user = self.user_repo.get_by_id(caller.user_id).await?;
        let cost = message_cost(&message);
        if cost > user.sms_credits {
            warn!(user_id = %user.id, %cost, balance = %user.sms_credits, "Insufficient SMS credits");
            return Err(DocTrackError::InsufficientCredits);
        }

        info!(user_id = %user.id, number = %number, %cost, "Sending SMS");
        let outcome = self.gateway.send(&number, &message).await;

        let now = Utc::now();
        let sequence = self.ledger.count_with_prefix(&month_prefix(now)).await? + 1;
        let status = match &outcome {
            Ok(reply) if reply.success => SmsStatus::Approved,
            _ => SmsStatus::Failed,
        };

        let entry = CreateSmsTransaction {
            name: transaction_name(now, sequence),
            credit_amount: cost,
            status,
            initiated_by: user.email.clone(),
            message,
            recipient: format!("{recipient}({number})"),
            user_id: user.id,
        };
        let tx = match self.ledger.charge(user.id, cost, entry).await {
            Ok(tx) => tx,
            Err(e) => {
                match &outcome {
                    Ok(reply) => error!(
                        user_id = %user.id,
                        %cost,
                        status = reply.status,
                        body = %reply.body,
                        error = %e,
                        "SMS reached the gateway but could not be charged"
                    ),
                    Err(gateway) => error!(
                        user_id = %user.id,
                        %cost,
                        gateway_error = %gateway,
                        error = %e,
                        "Failed SMS send could not be charged"
                    ),
                }
                return Err(e);
            }
        };

        match outcome {
            Ok(reply) if reply.success => {
                info!(transaction = %tx.name, "SMS sent");
                Ok(reply.body)
            }
            Ok(reply) => {
                error!(transaction = %tx.name, status = reply.status, body = %reply.body, "SMS gateway rejected message");
                Err(DocTrackError::Internal(SEND_FAILED.into()))
            }
            Err(e) => {
                error!(transaction = %tx.name, error = %e, "SMS gateway unreachable");
                Err(DocTrackError::Internal(SEND_FAILED.into()))
            }
        }
    }

    /// Current credit balance, read fresh from storage.
    pub async fn balance(&self, caller: &Caller) -> DocTrackResult<Decimal> {
        Ok(self.user_repo.get_by_id(caller.user_id).await?.sms_credits)
    }

    /// The caller's own ledger rows, newest first.
    pub async fn logs(
        &self,
        caller: &Caller,
        query: LogQuery,
    ) -> DocTrackResult<PaginatedResult<SmsTransaction>> {
        let window = log_window(query.filter.as_deref(), Utc::now());
        self.ledger
            .list_for_user(
                caller.user_id,
                window,
                Pagination::page(query.page.unwrap_or(1)),
            )
            .await
    }
}
