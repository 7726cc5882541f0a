//! User administration for admins and super admins.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use doctrack_auth::{UserInput, UserQuery};
use doctrack_core::models::user::User;
use serde_json::{Value, json};
use uuid::Uuid;

use super::PageBody;
use crate::error::ApiResult;
use crate::extract::{CurrentUser, JsonBody, PathParam, QueryParams};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(query, _): QueryParams<UserQuery>,
) -> ApiResult<Json<PageBody<User>>> {
    let page = state.directory.list(&current.caller, query.0).await?;
    Ok(Json(page.into()))
}

pub async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Json(input), _): JsonBody<UserInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = state.directory.create(&current.caller, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.directory.get(&current.caller, *id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
    WithRejection(Json(input), _): JsonBody<UserInput>,
) -> ApiResult<Json<Value>> {
    let user = state.directory.update(&current.caller, *id, input).await?;
    Ok(Json(json!({ "message": "User updated successfully", "user": user })))
}

pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(id, _): PathParam<Uuid>,
) -> ApiResult<Json<Value>> {
    state.directory.delete(&current.caller, *id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
