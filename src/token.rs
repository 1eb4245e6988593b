//! OAuth2 refresh-token exchange for XOAUTH2 mailboxes.
//!
//! Outlook and Hotmail mailboxes are reached with a long-lived refresh token
//! and a client id. [`TokenClient::exchange`] trades them for a short-lived
//! access token that [`ImapConfigBuilder::access_token`] accepts.
//!
//! Transport failures and 5xx answers are retried with exponential backoff;
//! anything else is returned immediately.
//!
//! [`ImapConfigBuilder::access_token`]: crate::ImapConfigBuilder::access_token
//!
//! # Example
//!
//! ```no_run
//! use inbox_otp::token::{OAuthConfig, TokenClient};
//! use inbox_otp::ImapConfig;
//!
//! # async fn example() -> inbox_otp::Result<()> {
//! let oauth = OAuthConfig::new("client-id", "M.C5_BAY...");
//! let token = TokenClient::new()?.exchange(&oauth).await?;
//!
//! let config = ImapConfig::builder()
//!     .email("user@hotmail.com")
//!     .access_token(token.secret())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Microsoft identity platform v2.0 token endpoint for consumer and work accounts.
pub const MICROSOFT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

const USER_AGENT: &str = concat!("inbox-otp/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in [`Error::TokenStatus`].
const MAX_ERROR_BODY: usize = 500;

/// Settings for one refresh-token exchange.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Application (client) id.
    pub client_id: String,
    refresh_token: SecretString,
    client_secret: Option<SecretString>,
    /// Token endpoint.
    pub token_url: String,
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Delay before the second attempt; doubled after each retry.
    pub initial_backoff: Duration,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("refresh_token", &"[REDACTED]")
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_url", &self.token_url)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .finish()
    }
}

impl OAuthConfig {
    /// Creates settings for the Microsoft endpoint with 3 attempts and a
    /// 750 ms initial backoff.
    #[must_use]
    pub fn new(client_id: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            refresh_token: SecretString::from(refresh_token.into()),
            client_secret: None,
            token_url: MICROSOFT_TOKEN_URL.to_string(),
            max_retries: 3,
            initial_backoff: Duration::from_millis(750),
        }
    }

    /// Sets the client secret for confidential applications.
    #[must_use]
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the total number of attempts and the initial backoff.
    #[must_use]
    pub fn retries(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() || self.refresh_token.expose_secret().trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "refresh token and client id are required".into(),
            });
        }
        if self.max_retries == 0 {
            return Err(Error::InvalidConfig {
                message: "max_retries must be at least 1".into(),
            });
        }
        Ok(())
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", self.refresh_token.expose_secret()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.expose_secret()));
        }
        form
    }
}

/// An access token returned by the token endpoint.
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    /// Lifetime reported by the endpoint.
    pub expires_in: Option<Duration>,
    /// Granted scopes, space separated.
    pub scope: Option<String>,
    /// Usually `Bearer`.
    pub token_type: Option<String>,
    refresh_token: Option<SecretString>,
}

impl AccessToken {
    /// Returns the bearer token.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Returns the rotated refresh token, when the endpoint issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    token_type: Option<String>,
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_access_token(self) -> Result<AccessToken> {
        let secret = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingAccessToken)?;

        Ok(AccessToken {
            secret: SecretString::from(secret),
            expires_in: self.expires_in.map(Duration::from_secs),
            scope: self.scope,
            token_type: self.token_type,
            refresh_token: self.refresh_token.map(SecretString::from),
        })
    }
}

/// HTTP client for the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
}

impl TokenClient {
    /// Creates a client with connect and request timeouts suited to the
    /// token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| Error::InvalidConfig {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }

    /// Wraps an existing HTTP client.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Exchanges the refresh token for an access token.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if the client id or refresh token is empty
    /// - [`Error::TokenRequest`] if every attempt failed in transport
    /// - [`Error::TokenStatus`] if the endpoint rejected the request
    /// - [`Error::MissingAccessToken`] if the response carried no token
    #[instrument(
        name = "TokenClient::exchange",
        skip_all,
        fields(token_url = %config.token_url, client_id = %config.client_id)
    )]
    pub async fn exchange(&self, config: &OAuthConfig) -> Result<AccessToken> {
        config.validate()?;

        let response = self.post_with_retries(config).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenStatus {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|source| Error::TokenResponse { source })?
            .into_access_token()?;

        debug!(expires_in = ?token.expires_in, "Access token issued");
        Ok(token)
    }

    async fn post_with_retries(&self, config: &OAuthConfig) -> Result<reqwest::Response> {
        let form = config.form();
        let mut backoff = config.initial_backoff;
        let mut attempt = 1;

        loop {
            let outcome = self.http.post(&config.token_url).form(&form).send().await;
            let last = attempt >= config.max_retries;

            match outcome {
                Ok(response) if response.status().is_server_error() && !last => {
                    warn!(attempt, status = %response.status(), "Token endpoint server error, retrying");
                }
                Ok(response) => return Ok(response),
                Err(source) if last => {
                    return Err(Error::TokenRequest {
                        url: config.token_url.clone(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Token request failed, retrying");
                }
            }

            tokio::time::sleep(backoff).await;
            backoff *= 2;
            attempt += 1;
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
