//! HTTP mapping of the domain error taxonomy.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doctrack_core::error::{DocTrackError, FieldErrors};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Error body: `{"error": kind, "message": text, "errors": {field: [..]}}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

/// A handler error. Wraps [`DocTrackError`] so `?` works on every service
/// call.
#[derive(Debug)]
pub struct ApiError(pub DocTrackError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unauthenticated() -> Self {
        Self(DocTrackError::AuthenticationFailed {
            reason: "Unauthenticated.".into(),
        })
    }

    /// A malformed request body or query, reported as a validation error on
    /// `field`.
    pub fn bad_input(field: &str, message: impl Into<String>) -> Self {
        Self(DocTrackError::invalid(field, message))
    }

    fn parts(self) -> (StatusCode, ErrorBody) {
        let body = |error, message: String| ErrorBody {
            error,
            message,
            errors: None,
        };
        match self.0 {
            DocTrackError::NotFound { entity, .. } => (
                StatusCode::NOT_FOUND,
                body("not_found", format!("The requested {} was not found.", entity.replace('_', " "))),
            ),
            DocTrackError::AlreadyExists { entity } => (
                StatusCode::CONFLICT,
                body("conflict", format!("The {} already exists.", entity.replace('_', " "))),
            ),
            DocTrackError::AuthenticationFailed { reason } => {
                (StatusCode::UNAUTHORIZED, body("unauthenticated", reason))
            }
            DocTrackError::AuthorizationDenied { reason } => {
                (StatusCode::FORBIDDEN, body("unauthorized", reason))
            }
            err @ DocTrackError::CrossDepartmentAssignment => (
                StatusCode::FORBIDDEN,
                body("cross_department_assignment", err.to_string()),
            ),
            DocTrackError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_error",
                    message: "The given data was invalid.".into(),
                    errors: Some(errors),
                },
            ),
            err @ DocTrackError::InsufficientCredits => (
                StatusCode::UNPROCESSABLE_ENTITY,
                body("insufficient_credits", err.to_string()),
            ),
            err @ DocTrackError::InvalidTransition { .. } => (
                StatusCode::BAD_REQUEST,
                body("invalid_transition", err.to_string()),
            ),
            DocTrackError::ServiceUnavailable(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("service_unavailable", message),
            ),
            DocTrackError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("internal_error", message),
            ),
            DocTrackError::Database(_) | DocTrackError::Crypto(_) | DocTrackError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("internal_error", "Internal server error.".into()),
            ),
        }
    }
}

impl From<DocTrackError> for ApiError {
    fn from(err: DocTrackError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_input("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_input("query", rejection.body_text())
    }
}

/// An id that cannot name any row is reported like an absent one.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!(rejection = %rejection.body_text(), "Unmatched path parameter");
        Self(DocTrackError::NotFound {
            entity: "resource".into(),
            id: String::new(),
        })
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_input("body", rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_input("body", err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.0.to_string();
        let (status, body) = self.parts();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %detail, "Request failed");
        } else if status == StatusCode::FORBIDDEN {
            warn!(error = %detail, "Request denied");
        }
        (status, Json(body)).into_response()
    }
}
