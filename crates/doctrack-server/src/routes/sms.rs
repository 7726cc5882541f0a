//! SMS sending, balance and history.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::WithRejection;
use doctrack_core::models::sms_transaction::SmsTransaction;
use doctrack_sms::{LogQuery, SendSms};
use serde_json::{Value, json};

use super::PageBody;
use crate::error::ApiResult;
use crate::extract::{CurrentUser, JsonBody, QueryParams};
use crate::state::AppState;

/// Returns the gateway's own response body on success.
pub async fn send_one(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Json(input), _): JsonBody<SendSms>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.sms.send(&current.caller, input).await?))
}

pub async fn balance(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Value>> {
    let credits = state.sms.balance(&current.caller).await?;
    Ok(Json(json!({ "sms_credits": credits })))
}

pub async fn logs(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(query, _): QueryParams<LogQuery>,
) -> ApiResult<Json<PageBody<SmsTransaction>>> {
    let page = state.sms.logs(&current.caller, query.0).await?;
    Ok(Json(page.into()))
}
