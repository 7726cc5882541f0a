//! Error types for the DocTrack system.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Per-field validation messages, keyed by request field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Report messages for `from` under the request name `to`.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(messages) = self.0.remove(from) {
            self.0.entry(to.to_owned()).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no field failed, otherwise a [`DocTrackError::Validation`].
    pub fn into_result(self) -> DocTrackResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DocTrackError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum DocTrackError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("You cannot assign records or users to another department")]
    CrossDepartmentAssignment,

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Insufficient SMS credits. Please add more credits.")]
    InsufficientCredits,

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocTrackError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        DocTrackError::Validation(errors)
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        DocTrackError::AuthorizationDenied {
            reason: reason.into(),
        }
    }
}

pub type DocTrackResult<T> = Result<T, DocTrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("control_no", "The control no field is required.");
        errors.add("control_no", "The control no must be a string.");
        errors.add("status", "The selected status is invalid.");

        assert_eq!(errors.get("control_no").map(<[String]>::len), Some(2));
        assert_eq!(errors.to_string(), "invalid fields: control_no, status");
        assert!(matches!(
            errors.into_result(),
            Err(DocTrackError::Validation(_))
        ));
    }
}
