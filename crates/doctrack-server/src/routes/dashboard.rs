//! Dashboard analytics.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::WithRejection;
use doctrack_records::{CategoryBreakdown, MunicipalityStats, NamedValue, OrmMonth, QuickStats};
use serde_json::{Value, json};

use super::{PageBody, PageQuery};
use crate::error::ApiResult;
use crate::extract::{CurrentUser, PathParam, QueryParams};
use crate::state::AppState;

pub async fn quick_stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<QuickStats>> {
    Ok(Json(state.records.quick_stats(&current.caller).await?))
}

pub async fn incoming(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<CategoryBreakdown>>> {
    Ok(Json(state.records.incoming_analytics(&current.caller).await?))
}

pub async fn outgoing(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<NamedValue>>> {
    Ok(Json(state.records.outgoing_analytics(&current.caller).await?))
}

/// ORM counts are global, but still require a signed-in caller.
pub async fn orm(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> ApiResult<Json<Vec<OrmMonth>>> {
    Ok(Json(state.records.orm_analytics().await?))
}

pub async fn municipalities(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<MunicipalityStats>>> {
    Ok(Json(state.records.municipality_stats(&current.caller).await?))
}

pub async fn municipality_records(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(name, _): PathParam<String>,
    WithRejection(query, _): QueryParams<PageQuery>,
) -> ApiResult<Json<Value>> {
    let (place, page) = state
        .records
        .municipality_records(&current.caller, &name, query.page())
        .await?;
    Ok(Json(json!({
        "municipality": place,
        "records": PageBody::from(page),
    })))
}
