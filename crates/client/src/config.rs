use std::time::Duration;

use serde::Deserialize;

/// User-facing texts. Every field can be overridden for localization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub status_updated: String,
    pub financials_updated: String,
    /// Shown when the server rejects a request without saying why.
    pub generic_error: String,
    pub network_error: String,
    /// Prefix for a status code the client does not know.
    pub unknown_status: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            status_updated: "Status updated".into(),
            financials_updated: "Financial data saved".into(),
            generic_error: "An error occurred".into(),
            network_error: "Network error, please try again".into(),
            unknown_status: "Unknown status".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub message_hide_delay_ms: u64,
    pub messages: Messages,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            bearer_token: None,
            message_hide_delay_ms: 3000,
            messages: Messages::default(),
        }
    }
}

impl ClientConfig {
    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.message_hide_delay_ms)
    }
}
