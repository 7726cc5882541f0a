//! DocTrack Server — HTTP API over the record, SMS and user services.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::{AppSettings, AppState};

/// Largest request body accepted: a batch of record images or one
/// outgoing attachment plus form fields.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the full router with tracing and CORS.
pub fn build_app(state: AppState) -> Router {
    routes::router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
