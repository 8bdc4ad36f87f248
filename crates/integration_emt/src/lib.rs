//! EMT Madrid open API client
//!
//! Logs in to the [EMT MobilityLabs](https://openapi.emtmadrid.es) open API,
//! discovers the bus lines serving a stop and retrieves per-line arrival
//! estimates.
//!
//! # Architecture
//!
//! [`Session`] owns the access token and sends authenticated requests.
//! Responses are decoded into an [`Envelope`] whose result code each caller
//! checks against its own success codes. [`Stop`] and [`Line`] are built from
//! the decoded payloads, and [`EmtClient`] ties it together behind the
//! [`ArrivalsClient`] trait.
//!
//! Requests are issued one at a time. Nothing is cached or retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_emt::{ArrivalsClient, EmtClient, EmtConfig};
//!
//! let config = EmtConfig::with_credentials("my-client-id", "my-pass-key");
//! let client = EmtClient::connect(config).await?;
//!
//! let mut stop = client.get_stop(72).await?;
//! for line in stop.lines() {
//!     println!("{line}");
//! }
//!
//! client.refresh_arrivals(&mut stop).await?;
//! ```

mod client;
mod config;
mod envelope;
mod error;
mod models;
mod session;
mod stops;

pub use client::{ArrivalsClient, EmtClient};
pub use config::{ArrivalDateFormat, EmtConfig};
pub use envelope::{
    ARRIVALS_POINTER, CODE_LOGIN_OK, CODE_OK, CODE_TOKEN_ACTIVE, DATA_CODES, Envelope,
    LOGIN_CODES, LOGIN_TOKEN_POINTER, STOP_LINES_POINTER, WHOAMI_CODES, interpret,
};
pub use error::EmtError;
pub use models::{Line, Stop};
pub use session::{
    ACCESS_TOKEN_HEADER, CLIENT_ID_HEADER, LOGIN_PATH, PASS_KEY_HEADER, Session, WHOAMI_PATH,
};
pub use stops::{ArrivalsRequest, arrivals_path, fetch_arrival_times, fetch_lines, stop_detail_path};
