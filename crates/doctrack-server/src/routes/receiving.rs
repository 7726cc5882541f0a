//! Intake desk endpoints over the master list of receiving records.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use doctrack_core::models::receiving_record::RecordDetail;
use doctrack_records::RecordInput;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{PageBody, PageQuery};
use crate::error::ApiResult;
use crate::extract::{CurrentUser, FormOrJson, PathParam, QueryParams};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(query, _): QueryParams<PageQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.records.list_intake(&current.caller, query.page()).await?;
    Ok(Json(json!({
        "message": "Records retrieved successfully",
        "records": PageBody::from(page),
    })))
}

/// Accepts JSON, or a multipart form with `images[]` files.
pub async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    mut form: FormOrJson<RecordInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let images = form.take_files("images");
    let record = state
        .records
        .create(&current.caller, form.data, images)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Record created successfully",
            "record": record,
        })),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = state.records.show_intake(&current.caller, *id).await?;
    Ok(record_body("Record retrieved successfully", record))
}

/// Close a decided record.
pub async fn complete(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = state.records.mark_completed(&current.caller, *id).await?;
    Ok(record_body("Record marked as completed", record))
}

pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    state.records.delete(&current.caller, *id).await?;
    Ok(Json(json!({ "message": "Record deleted successfully" })))
}

fn record_body(message: &str, record: RecordDetail) -> Json<Value> {
    Json(json!({ "message": message, "record": record }))
}
