//! Authentication error types.

use doctrack_core::error::DocTrackError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Session has ended")]
    SessionRevoked,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for DocTrackError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => DocTrackError::Crypto(msg),
            other => DocTrackError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
