//! Department dashboard: records routed to the caller's department.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::WithRejection;
use doctrack_records::DepartmentUpdateInput;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::PageBody;
use crate::error::ApiResult;
use crate::extract::{CurrentUser, JsonBody, PathParam, QueryParams};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentQuery {
    category: Option<String>,
    page: Option<u64>,
}

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(query, _): QueryParams<DepartmentQuery>,
) -> ApiResult<Json<Value>> {
    let page = state
        .records
        .list_department(
            &current.caller,
            query.category.as_deref(),
            query.page.unwrap_or(1),
        )
        .await?;
    Ok(Json(json!({
        "message": "Records retrieved successfully",
        "records": PageBody::from(page),
        "department": current.caller.department,
    })))
}

pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = state.records.show_department(&current.caller, *id).await?;
    Ok(Json(json!({
        "message": "Record retrieved successfully",
        "record": record,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
    WithRejection(Json(input), _): JsonBody<DepartmentUpdateInput>,
) -> ApiResult<Json<Value>> {
    let record = state
        .records
        .update_department(&current.caller, *id, input)
        .await?;
    Ok(Json(json!({
        "message": "Record updated successfully",
        "record": record,
    })))
}

pub async fn statistics(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Value>> {
    let stats = state.records.statistics(&current.caller).await?;
    Ok(Json(json!({
        "message": "Statistics retrieved successfully",
        "statistics": stats.statistics,
        "category_counts": stats.category_counts,
        "department": stats.department,
    })))
}
