//! Gateway error types.

use doctrack_core::error::DocTrackError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("SMS gateway is not configured")]
    NotConfigured,

    #[error("SMS gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<GatewayError> for DocTrackError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured => {
                DocTrackError::ServiceUnavailable("SMS Service is not configured.".into())
            }
            other => DocTrackError::Internal(other.to_string()),
        }
    }
}
