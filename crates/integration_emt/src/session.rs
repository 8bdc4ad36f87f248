//! Authenticated session against the EMT open API
//!
//! The session owns the access token: [`Session::login`] is the only writer,
//! and every authenticated request reads it while building headers.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::EmtConfig;
use crate::envelope::{self, Envelope, LOGIN_CODES, LOGIN_TOKEN_POINTER, WHOAMI_CODES};
use crate::error::EmtError;

/// Login endpoint, credentials go in headers
pub const LOGIN_PATH: &str = "v3/mobilitylabs/user/login/";
/// Token check endpoint
pub const WHOAMI_PATH: &str = "v1/mobilitylabs/user/whoami/";

/// Header carrying the API key on login
pub const CLIENT_ID_HEADER: &str = "X-ClientId";
/// Header carrying the API secret on login
pub const PASS_KEY_HEADER: &str = "passKey";
/// Header carrying the access token on authenticated requests
pub const ACCESS_TOKEN_HEADER: &str = "accessToken";

/// Authenticated connection to the EMT open API
#[derive(Debug)]
pub struct Session {
    client: Client,
    config: EmtConfig,
    access_token: RwLock<Option<SecretString>>,
}

impl Session {
    /// Create a session without logging in
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: EmtConfig) -> Result<Self, EmtError> {
        config.validate().map_err(EmtError::Configuration)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| EmtError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config,
            access_token: RwLock::new(None),
        })
    }

    /// The configuration this session was built from
    #[must_use]
    pub const fn config(&self) -> &EmtConfig {
        &self.config
    }

    /// Whether a login has stored a token
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.access_token.read().is_some()
    }

    /// A copy of the current access token, if logged in
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.access_token.read().clone()
    }

    /// Log in with the configured credentials and store the returned token
    ///
    /// Any previous token is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`EmtError::Network`] if the exchange fails,
    /// [`EmtError::Server`] if the operator answers with a code other than
    /// `"00"` or `"01"`, and [`EmtError::Decode`] if the payload carries no token.
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub async fn login(&self) -> Result<(), EmtError> {
        let request = self
            .client
            .get(self.config.endpoint(LOGIN_PATH))
            .header(CLIENT_ID_HEADER, &self.config.client_id)
            .header(PASS_KEY_HEADER, self.config.pass_key.expose_secret());

        let envelope = Self::exchange(request).await?.expect_code(LOGIN_CODES)?;
        let token: String = envelope.extract(LOGIN_TOKEN_POINTER)?;

        *self.access_token.write() = Some(SecretString::from(token));
        info!("Logged in to EMT open API");
        Ok(())
    }

    /// Check that the stored token is still accepted
    ///
    /// # Errors
    ///
    /// Returns [`EmtError::NotAuthenticated`] before login,
    /// [`EmtError::Network`] if the exchange fails and [`EmtError::Server`]
    /// if the operator answers with a code other than `"02"`.
    #[instrument(skip(self))]
    pub async fn is_token_active(&self) -> Result<(), EmtError> {
        self.authenticated_get(WHOAMI_PATH)
            .await?
            .expect_code(WHOAMI_CODES)?;
        debug!("Access token is active");
        Ok(())
    }

    /// Send an authenticated GET and decode the envelope
    ///
    /// The envelope code is not checked; callers apply their own success codes.
    ///
    /// # Errors
    ///
    /// Returns [`EmtError::NotAuthenticated`] before login,
    /// [`EmtError::Network`] if the exchange fails and [`EmtError::Decode`]
    /// if the body is not an envelope.
    #[instrument(skip(self))]
    pub async fn authenticated_get(&self, path: &str) -> Result<Envelope, EmtError> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        let request = self.authorize(self.client.get(url))?;
        Self::exchange(request).await
    }

    /// Send an authenticated POST with a JSON body and decode the envelope
    ///
    /// The envelope code is not checked; callers apply their own success codes.
    ///
    /// # Errors
    ///
    /// Same as [`Session::authenticated_get`].
    #[instrument(skip(self, body))]
    pub async fn authenticated_post<B>(&self, path: &str, body: &B) -> Result<Envelope, EmtError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.config.endpoint(path);
        debug!(%url, "POST");
        let request = self.authorize(self.client.post(url).json(body))?;
        Self::exchange(request).await
    }

    /// Attach the access token header
    ///
    /// The lock is released before the request is sent.
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, EmtError> {
        let guard = self.access_token.read();
        let token = guard.as_ref().ok_or(EmtError::NotAuthenticated)?;
        Ok(request.header(ACCESS_TOKEN_HEADER, token.expose_secret()))
    }

    async fn exchange(request: RequestBuilder) -> Result<Envelope, EmtError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmtError::http_status(status));
        }

        let body = response.text().await?;
        envelope::interpret(status, &body)
    }
}
