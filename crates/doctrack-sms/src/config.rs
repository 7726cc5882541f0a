//! SMS gateway configuration.

/// TxtBox gateway settings. The service refuses to send while either
/// the URL or the API key is missing.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 15,
        }
    }
}

impl SmsConfig {
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.url) && set(&self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_both_url_and_key() {
        assert!(!SmsConfig::default().is_configured());
        let partial = SmsConfig {
            url: Some("https://ws-v2.txtbox.com/messaging/v1/sms/push".into()),
            api_key: Some("   ".into()),
            ..SmsConfig::default()
        };
        assert!(!partial.is_configured());
        let full = SmsConfig {
            api_key: Some("key".into()),
            ..partial
        };
        assert!(full.is_configured());
    }
}
