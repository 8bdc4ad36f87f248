//! EMT client configuration

use std::fmt;

use chrono::{Datelike, NaiveDate};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// How the reference date sent with arrival requests is rendered
///
/// The upstream clients concatenate year, month and day without zero padding
/// (`2025-03-01` becomes `202531`). Whether the server tolerates the padded
/// form has not been verified, so the unpadded form stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalDateFormat {
    /// `{year}{month}{day}` without padding, e.g. `202531`
    #[default]
    Unpadded,
    /// `YYYYMMDD`, e.g. `20250301`
    ZeroPadded,
}

impl ArrivalDateFormat {
    /// Render a date in this format
    #[must_use]
    pub fn render(self, date: NaiveDate) -> String {
        match self {
            Self::Unpadded => format!("{}{}{}", date.year(), date.month(), date.day()),
            Self::ZeroPadded => date.format("%Y%m%d").to_string(),
        }
    }
}

/// Configuration for the EMT open API client
#[derive(Clone, Serialize, Deserialize)]
pub struct EmtConfig {
    /// Base URL of the open API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `X-ClientId` on login
    #[serde(default)]
    pub client_id: String,

    /// API secret sent as `passKey` on login
    #[serde(default = "empty_secret", skip_serializing)]
    pub pass_key: SecretString,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Rendering of the reference date in arrival requests
    #[serde(default)]
    pub arrival_date_format: ArrivalDateFormat,
}

impl fmt::Debug for EmtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmtConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("pass_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("arrival_date_format", &self.arrival_date_format)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://openapi.emtmadrid.es".to_string()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("emt-arrivals/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for EmtConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: String::new(),
            pass_key: empty_secret(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            arrival_date_format: ArrivalDateFormat::default(),
        }
    }
}

impl EmtConfig {
    /// Create a configuration with the given credentials and default settings
    #[must_use]
    pub fn with_credentials(client_id: impl Into<String>, pass_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            pass_key: SecretString::from(pass_key.into()),
            ..Default::default()
        }
    }

    /// Create a configuration suitable for testing against a mock server
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 5,
            ..Self::with_credentials("test-client", "test-pass-key")
        }
    }

    /// Join an endpoint path onto the base URL
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.client_id.trim().is_empty() {
            return Err("client_id must not be empty".to_string());
        }

        if self.pass_key.expose_secret().trim().is_empty() {
            return Err("pass_key must not be empty".to_string());
        }

        if HeaderValue::from_str(&self.client_id).is_err() {
            return Err("client_id contains characters not allowed in a header".to_string());
        }

        if HeaderValue::from_str(self.pass_key.expose_secret()).is_err() {
            return Err("pass_key contains characters not allowed in a header".to_string());
        }

        Ok(())
    }
}
