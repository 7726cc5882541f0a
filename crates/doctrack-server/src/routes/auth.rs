//! Login, logout, registration and the caller's own profile.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum_extra::TypedHeader;
use axum_extra::extract::{CookieJar, WithRejection};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::headers::UserAgent;
use doctrack_auth::{LoginInput, UserInput};
use doctrack_core::models::user::{User, UserRole};
use doctrack_core::policy::Caller;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::Duration;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{CurrentUser, JsonBody, TOKEN_COOKIE};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

/// The user as shown to the web client after login.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    role: UserRole,
    department: Option<String>,
    accessible_pages: Vec<String>,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        let accessible_pages = Caller::from(&user).accessible_pages();
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            department: user.department,
            accessible_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    token_type: &'static str,
    expires_in: u64,
    user: SessionUser,
}

fn session_cookie(token: String, max_age: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(i64::try_from(max_age).unwrap_or(i64::MAX)))
        .build()
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    user_agent: Option<TypedHeader<UserAgent>>,
    WithRejection(Json(body), _): JsonBody<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let output = state
        .auth
        .login(LoginInput {
            email: body.email.unwrap_or_default(),
            password: body.password.unwrap_or_default(),
            ip_address: client_ip(&headers),
            user_agent: user_agent.map(|TypedHeader(ua)| ua.as_str().to_owned()),
        })
        .await?;

    let cookie = session_cookie(
        output.access_token.clone(),
        output.expires_in,
        state.cookie_secure,
    );
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: output.access_token,
            token_type: "bearer",
            expires_in: output.expires_in,
            user: output.user.into(),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    state.auth.logout(current.session_id).await?;
    Ok((
        jar.remove(Cookie::build(TOKEN_COOKIE).path("/")),
        Json(json!({ "message": "Successfully logged out" })),
    ))
}

pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(input), _): JsonBody<UserInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = state.auth.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": user })),
    ))
}

/// Which department pages the caller may open.
pub async fn departments(current: CurrentUser) -> Json<Value> {
    Json(json!({
        "message": "User departments access",
        "user": current.user.email,
        "department": current.user.department,
        "accessible_pages": current.caller.accessible_pages(),
    }))
}
