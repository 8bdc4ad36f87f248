//! EMT arrivals client
//!
//! Entry point composing a logged-in [`Session`] with the stop lookups.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::config::EmtConfig;
use crate::error::EmtError;
use crate::models::Stop;
use crate::session::Session;

/// Trait for bus arrival clients
#[async_trait]
pub trait ArrivalsClient: Send + Sync {
    /// Fetch a stop with its lines and current arrival estimates
    async fn get_stop(&self, stop_id: u32) -> Result<Stop, EmtError>;

    /// Replace the arrival estimates of every line of a stop
    async fn refresh_arrivals(&self, stop: &mut Stop) -> Result<(), EmtError>;

    /// Check that the session token is still accepted
    async fn is_token_active(&self) -> Result<(), EmtError>;
}

/// Client for the EMT Madrid open API
#[derive(Debug)]
pub struct EmtClient {
    session: Session,
}

impl EmtClient {
    /// Create a client and log in immediately
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the login fails.
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub async fn connect(config: EmtConfig) -> Result<Self, EmtError> {
        let session = Session::new(config)?;
        session.login().await?;
        info!("EMT client ready");
        Ok(Self { session })
    }

    /// The underlying authenticated session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl ArrivalsClient for EmtClient {
    #[instrument(skip(self))]
    async fn get_stop(&self, stop_id: u32) -> Result<Stop, EmtError> {
        Stop::fetch(&self.session, stop_id).await
    }

    #[instrument(skip(self, stop), fields(stop_id = stop.id()))]
    async fn refresh_arrivals(&self, stop: &mut Stop) -> Result<(), EmtError> {
        stop.refresh_arrivals(&self.session).await
    }

    async fn is_token_active(&self) -> Result<(), EmtError> {
        self.session.is_token_active().await
    }
}
