//! Outgoing documents, open to every signed-in user.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use doctrack_core::models::outgoing_record::OutgoingDetail;
use doctrack_records::{OutgoingInput, OutgoingQuery};
use serde_json::{Value, json};
use uuid::Uuid;

use super::PageBody;
use crate::error::ApiResult;
use crate::extract::{CurrentUser, FormOrJson, PathParam, QueryParams};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(query, _): QueryParams<OutgoingQuery>,
) -> ApiResult<Json<PageBody<OutgoingDetail>>> {
    let page = state.outgoing.list(&current.caller, query.0).await?;
    Ok(Json(page.into()))
}

/// The attachment, if any, arrives as the multipart `file` part.
pub async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    mut form: FormOrJson<OutgoingInput>,
) -> ApiResult<(StatusCode, Json<OutgoingDetail>)> {
    let file = form.take_files("file").into_iter().next();
    let record = state
        .outgoing
        .create(&current.caller, form.data, file)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<OutgoingDetail>> {
    Ok(Json(state.outgoing.show(&current.caller, *id).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    state.outgoing.delete(&current.caller, *id).await?;
    Ok(Json(json!({ "message": "Record deleted successfully" })))
}
