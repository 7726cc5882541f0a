//! Route table and shared response shapes.

mod auth;
mod dashboard;
mod department;
mod outgoing;
mod receiving;
mod sms;
mod users;

use axum::Router;
use axum::routing::{get, post, put};
use doctrack_core::repository::PaginatedResult;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// A page of results in the shape the web client expects.
#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub data: Vec<T>,
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl<T> From<PaginatedResult<T>> for PageBody<T> {
    fn from(page: PaginatedResult<T>) -> Self {
        Self {
            current_page: page.current_page(),
            last_page: page.last_page(),
            per_page: page.limit,
            total: page.total,
            data: page.items,
        }
    }
}

/// `?page=` on listing endpoints. Pages start at 1.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/register", post(auth::register))
        .route("/departments", get(auth::departments))
        .route(
            "/receiving-records",
            get(receiving::index).post(receiving::store),
        )
        .route(
            "/receiving-records/{id}",
            get(receiving::show)
                .put(receiving::complete)
                .delete(receiving::destroy),
        )
        .route("/receiving-records/{id}/complete", put(receiving::complete))
        .route("/my-department/records", get(department::index))
        .route(
            "/my-department/records/{id}",
            get(department::show).put(department::update),
        )
        .route("/my-department/statistics", get(department::statistics))
        .route("/dashboard/quick-stats", get(dashboard::quick_stats))
        .route("/dashboard/incoming-analytics", get(dashboard::incoming))
        .route("/dashboard/outgoing-analytics", get(dashboard::outgoing))
        .route("/dashboard/orm-analytics", get(dashboard::orm))
        .route("/dashboard/municipality-stats", get(dashboard::municipalities))
        .route(
            "/dashboard/municipality/{name}/records",
            get(dashboard::municipality_records),
        )
        .route("/sms/send-one", post(sms::send_one))
        .route("/sms/balance", get(sms::balance))
        .route("/sms/logs", get(sms::logs))
        .route("/users", get(users::index).post(users::store))
        .route(
            "/users/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
        .route(
            "/outgoing-records",
            get(outgoing::index).post(outgoing::store),
        )
        .route(
            "/outgoing-records/{id}",
            get(outgoing::show).delete(outgoing::destroy),
        )
}

async fn health() -> &'static str {
    "ok"
}
