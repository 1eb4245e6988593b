//! IMAP client that feeds recent messages to the OTP extractor.
//!
//! The [`ImapOtpClient`] is the mailbox side of this crate. It connects,
//! pulls the newest messages from the configured sender and hands them to
//! [`OtpExtractor::classify`]. For one-shot lookups use [`fetch_latest_otp`].
//!
//! # Example
//!
//! ```no_run
//! use inbox_otp::{ImapConfig, ImapOtpClient, OtpExtractor};
//!
//! # async fn example() -> inbox_otp::Result<()> {
//! let config = ImapConfig::builder()
//!     .email("user@outlook.com")
//!     .password("app-password")
//!     .build()?;
//!
//! let mut client = ImapOtpClient::connect(config).await?;
//! let result = client.latest_otp(&OtpExtractor::default()).await?;
//! println!("{}: {:?}", result.status(), result.otp());
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::ImapConfig;
use crate::connection;
use crate::error::{Error, Result};
use crate::extractor::OtpExtractor;
use crate::message::{ClassificationResult, MessageRecord};
use crate::parser;
use crate::session::{self, AuthConfig, ImapSession};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Async IMAP client for OTP lookups.
///
/// Create using [`ImapOtpClient::connect`], call [`logout`](Self::logout)
/// when done.
pub struct ImapOtpClient {
    session: Box<ImapSession>,
    config: ImapConfig,
}

impl ImapOtpClient {
    /// Connects, authenticates and selects the configured mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection cannot be established
    /// - Authentication fails
    /// - Mailbox selection fails
    ///
    /// Each step fails with its timeout variant when it exceeds the
    /// configured [`TimeoutConfig`](crate::TimeoutConfig).
    #[instrument(
        name = "ImapOtpClient::connect",
        skip_all,
        fields(
            email = %config.email(),
            imap_host = %config.effective_imap_host(),
            mechanism = config.credentials().mechanism()
        )
    )]
    pub async fn connect(config: ImapConfig) -> Result<Self> {
        let session = Self::initialize_session(&config).await?;

        debug!("Client connected and ready");

        Ok(Self {
            session: Box::new(session),
            config,
        })
    }

    /// Fetches the newest messages from the configured sender, newest first.
    ///
    /// At most [`FetchConfig::max_messages`](crate::FetchConfig::max_messages)
    /// messages are returned. Messages that fail to parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the search or a fetch fails or times out.
    #[instrument(
        name = "ImapOtpClient::fetch_messages",
        skip(self),
        fields(mailbox = %self.config.fetch.mailbox)
    )]
    pub async fn fetch_messages(&mut self) -> Result<Vec<MessageRecord>> {
        let uids = self.search_newest().await?;
        let fetch_timeout = self.config.timeouts.message_fetch;

        let mut records = Vec::with_capacity(uids.len());
        for uid in uids {
            let raw = tokio::time::timeout(
                fetch_timeout,
                session::fetch_message(&mut self.session, uid),
            )
            .await
            .map_err(|_| Error::FetchTimeout {
                uid,
                timeout: fetch_timeout,
            })??;

            if let Some(record) = raw.as_ref().and_then(parser::record_from_raw) {
                records.push(record);
            }
        }

        debug!(message_count = records.len(), "Fetched messages");

        Ok(records)
    }

    /// Fetches recent messages and classifies them.
    ///
    /// # Errors
    ///
    /// Returns an error only if fetching fails; "no messages" and "no code"
    /// are reported through [`ClassificationResult`].
    #[instrument(name = "ImapOtpClient::latest_otp", skip_all)]
    pub async fn latest_otp(&mut self, extractor: &OtpExtractor) -> Result<ClassificationResult> {
        let messages = self.fetch_messages().await?;
        Ok(extractor.classify(&messages))
    }

    /// Logs out from the IMAP server.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout command fails or times out.
    #[instrument(name = "ImapOtpClient::logout", skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        let timeout = self.config.timeouts.logout;
        tokio::time::timeout(timeout, session::logout(&mut self.session))
            .await
            .map_err(|_| Error::LogoutTimeout { timeout })?
    }

    /// Returns the email address used for this connection.
    #[must_use]
    pub fn email(&self) -> &str {
        self.config.email()
    }

    /// Returns the IMAP host used for this connection.
    #[must_use]
    pub fn imap_host(&self) -> String {
        self.config.effective_imap_host()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Initializes IMAP session with connection, authentication, and mailbox selection.
    async fn initialize_session(config: &ImapConfig) -> Result<ImapSession> {
        let imap_host = config.effective_imap_host();
        let target_addr = config.server_address();
        let timeouts = &config.timeouts;

        let tls_stream = tokio::time::timeout(
            timeouts.connect,
            connection::establish_tls_connection(&imap_host, &target_addr),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout: timeouts.connect,
        })??;

        debug!("TLS connection established");

        let auth_config = AuthConfig {
            email: config.email(),
            credentials: config.credentials(),
            secret: config.secret(),
        };

        let mut session = tokio::time::timeout(
            timeouts.auth,
            session::authenticate(tls_stream, &auth_config),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            email: config.email().to_string(),
            timeout: timeouts.auth,
        })??;

        debug!("Authenticated");

        let mailbox = &config.fetch.mailbox;
        tokio::time::timeout(
            timeouts.select,
            session::select_mailbox(&mut session, mailbox),
        )
        .await
        .map_err(|_| Error::SelectTimeout {
            mailbox: mailbox.clone(),
            timeout: timeouts.select,
        })??;

        debug!(mailbox = %mailbox, "Selected mailbox");

        Ok(session)
    }

    /// Searches for the newest UIDs matching the sender filter.
    async fn search_newest(&mut self) -> Result<Vec<u32>> {
        let timeout = self.config.timeouts.search;
        let query = session::search_query(self.config.fetch.sender.as_deref());
        let limit = self.config.fetch.max_messages;

        tokio::time::timeout(
            timeout,
            session::search_newest_uids(&mut self.session, &query, limit),
        )
        .await
        .map_err(|_| Error::SearchTimeout { timeout })?
    }
}

impl std::fmt::Debug for ImapOtpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapOtpClient")
            .field("email", &self.config.email())
            .field("imap_host", &self.config.effective_imap_host())
            .field("mailbox", &self.config.fetch.mailbox)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`fetch_latest_otp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpLookup {
    /// Classification of the fetched messages.
    pub result: ClassificationResult,
    /// Wall time from connect to logout.
    pub elapsed: Duration,
}

/// Connects, classifies the newest messages and logs out.
///
/// A failed logout is logged and does not discard the result.
///
/// # Errors
///
/// Returns an error if connecting or fetching fails.
///
/// # Example
///
/// ```no_run
/// use inbox_otp::{fetch_latest_otp, ImapConfig, OtpExtractor};
///
/// # async fn example() -> inbox_otp::Result<()> {
/// let config = ImapConfig::builder()
///     .email("user@hotmail.com")
///     .access_token("eyJ0eXAi...")
///     .build()?;
///
/// let lookup = fetch_latest_otp(config, &OtpExtractor::default()).await?;
/// println!("{} in {:?}", lookup.result.status(), lookup.elapsed);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "fetch_latest_otp", skip_all, fields(email = %config.email()))]
pub async fn fetch_latest_otp(config: ImapConfig, extractor: &OtpExtractor) -> Result<OtpLookup> {
    let started = Instant::now();

    let mut client = ImapOtpClient::connect(config).await?;
    let result = client.latest_otp(extractor).await;

    if let Err(e) = client.logout().await {
        warn!(error = %e, "Logout failed");
    }

    let result = result?;
    let elapsed = started.elapsed();

    debug!(status = %result.status(), elapsed_ms = elapsed.as_millis(), "OTP lookup finished");

    Ok(OtpLookup { result, elapsed })
}
