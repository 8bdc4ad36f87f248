//! Response envelope and its interpretation
//!
//! Every EMT endpoint wraps its payload in the same envelope:
//!
//! ```json
//! { "code": "00", "description": "...", "data": [ ... ] }
//! ```
//!
//! What counts as a successful `code` differs per endpoint, so decoding and
//! code checking are separate steps: [`interpret`] turns an HTTP outcome into
//! an [`Envelope`], and the caller then applies [`Envelope::expect_code`] with
//! its own accepted set.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::EmtError;

/// Success code for data endpoints
pub const CODE_OK: &str = "00";
/// Alternate success code returned by login
pub const CODE_LOGIN_OK: &str = "01";
/// Success code returned by the whoami token check
pub const CODE_TOKEN_ACTIVE: &str = "02";

/// Accepted codes for the login endpoint
pub const LOGIN_CODES: &[&str] = &[CODE_OK, CODE_LOGIN_OK];
/// Accepted codes for the whoami endpoint
pub const WHOAMI_CODES: &[&str] = &[CODE_TOKEN_ACTIVE];
/// Accepted codes for stop detail and arrivals
pub const DATA_CODES: &[&str] = &[CODE_OK];

/// Location of the access token in a login payload
pub const LOGIN_TOKEN_POINTER: &str = "/0/accessToken";
/// Location of the line array in a stop detail payload
pub const STOP_LINES_POINTER: &str = "/0/0/0/dataLine";
/// Location of the arrival array in an arrivals payload
pub const ARRIVALS_POINTER: &str = "/0/Arrive";

/// The operator's standard response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Operator result code
    pub code: String,
    /// Human-readable detail, mostly present on errors
    #[serde(default)]
    pub description: Option<String>,
    /// Endpoint-specific payload
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Check the result code against the codes this endpoint treats as success
    ///
    /// # Errors
    ///
    /// Returns [`EmtError::Server`] carrying the received code and description
    /// when the code is not in `accepted`.
    pub fn expect_code(self, accepted: &[&str]) -> Result<Self, EmtError> {
        if accepted.contains(&self.code.as_str()) {
            return Ok(self);
        }

        warn!(code = %self.code, description = ?self.description, "EMT rejected request");
        Err(EmtError::Server {
            code: self.code,
            description: self.description.unwrap_or_default(),
        })
    }

    /// Deserialize the payload found at a fixed JSON pointer inside `data`
    ///
    /// # Errors
    ///
    /// Returns [`EmtError::Decode`] when nothing exists at `pointer` or the
    /// value there does not have the shape of `T`.
    pub fn extract<T: DeserializeOwned>(&self, pointer: &str) -> Result<T, EmtError> {
        let value = self
            .data
            .pointer(pointer)
            .ok_or_else(|| EmtError::Decode(format!("payload has nothing at data{pointer}")))?;

        T::deserialize(value)
            .map_err(|e| EmtError::Decode(format!("unexpected payload at data{pointer}: {e}")))
    }
}

/// Turn an HTTP outcome into a decoded envelope
///
/// Non-2xx statuses are reported as [`EmtError::Network`] without looking at
/// the body.
///
/// # Errors
///
/// Returns [`EmtError::Network`] for non-2xx statuses and
/// [`EmtError::Decode`] when the body is not a valid envelope.
pub fn interpret(status: StatusCode, body: &str) -> Result<Envelope, EmtError> {
    if !status.is_success() {
        return Err(EmtError::http_status(status));
    }

    serde_json::from_str(body).map_err(|e| EmtError::Decode(format!("invalid envelope: {e}")))
}
