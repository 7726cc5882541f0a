//! Outbound SMS gateways.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::SmsConfig;
use crate::error::GatewayError;

/// Header carrying the TxtBox API key.
pub const AUTH_HEADER: &str = "X-TXTBOX-Auth";

/// What the gateway answered.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// Whether the gateway accepted the message (2xx).
    pub success: bool,
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string.
    pub body: Value,
}

/// A provider that can deliver one text message.
pub trait SmsGateway: Send + Sync {
    fn is_configured(&self) -> bool;

    fn send(
        &self,
        number: &str,
        message: &str,
    ) -> impl Future<Output = Result<GatewayResponse, GatewayError>> + Send;
}

/// TxtBox push API client: form POST of `message` and `number`.
#[derive(Clone)]
pub struct TxtBoxGateway {
    client: reqwest::Client,
    config: SmsConfig,
}

impl TxtBoxGateway {
    pub fn new(config: SmsConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

impl SmsGateway for TxtBoxGateway {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(&self, number: &str, message: &str) -> Result<GatewayResponse, GatewayError> {
        let (Some(url), Some(api_key)) = (self.config.url.as_deref(), self.config.api_key.as_deref())
        else {
            return Err(GatewayError::NotConfigured);
        };

        let response = self
            .client
            .post(url)
            .header(AUTH_HEADER, api_key)
            .form(&[("message", message), ("number", number)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), "TxtBox gateway responded");

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(GatewayResponse {
            success: status.is_success(),
            status: status.as_u16(),
            body,
        })
    }
}
