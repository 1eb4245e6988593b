//! # inbox-otp
//!
//! Heuristic extraction of one-time passcodes from webmail messages.
//!
//! Two extraction modes share one digit tokenizer and one ignore-list:
//!
//! - **Single best** ([`OtpExtractor::classify`]): walks messages newest first
//!   and reports the first authoritative code, or why there is none.
//! - **Collect all** ([`CodeCollector::collect_codes`]): gathers every distinct
//!   code from scraped inbox rows that look like confirmation mails.
//!
//! Around the core sit an async IMAP client (password or XOAUTH2 login) and
//! an OAuth2 refresh-token exchange for Microsoft accounts.
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed tracing.
//!   Without this feature, tracing spans are still emitted but require no OTEL dependencies.
//!
//! ## Quick Start
//!
//! ```
//! use inbox_otp::{ClassificationResult, MessageRecord, OtpExtractor};
//!
//! let extractor = OtpExtractor::default();
//! let messages = [
//!     MessageRecord::text("Welcome", "Thanks for joining"),
//!     MessageRecord::text("Login", "Your code: 482913"),
//! ];
//!
//! match extractor.classify(&messages) {
//!     ClassificationResult::Found { otp, subject, .. } => {
//!         assert_eq!(otp, "482913");
//!         assert_eq!(subject, "Login");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ## Reading the mailbox over IMAP
//!
//! ```no_run
//! use inbox_otp::{fetch_latest_otp, ImapConfig, OtpExtractor};
//!
//! # async fn example() -> inbox_otp::Result<()> {
//! let config = ImapConfig::builder()
//!     .email("user@outlook.com")
//!     .password("app-password")
//!     .build()?;
//!
//! let lookup = fetch_latest_otp(config, &OtpExtractor::default()).await?;
//! println!("{} {:?}", lookup.result.status(), lookup.result.otp());
//! # Ok(())
//! # }
//! ```
//!
//! ## OAuth2 accounts
//!
//! ```no_run
//! use inbox_otp::token::{OAuthConfig, TokenClient};
//! use inbox_otp::{fetch_latest_otp, ImapConfig, OtpExtractor};
//!
//! # async fn example() -> inbox_otp::Result<()> {
//! let oauth = OAuthConfig::new("client-id", "refresh-token");
//! let token = TokenClient::new()?.exchange(&oauth).await?;
//!
//! let config = ImapConfig::builder()
//!     .email("user@hotmail.com")
//!     .access_token(token.secret())
//!     .build()?;
//!
//! let lookup = fetch_latest_otp(config, &OtpExtractor::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Extraction never fails. Mailbox and token errors implement
//! `std::error::Error`; use [`Error::is_retryable`] to decide whether to try
//! again:
//!
//! ```
//! use inbox_otp::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_retryable() {
//!         println!("Transient error, can retry: {}", error);
//!     } else {
//!         println!("Permanent error: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Network operations emit
//! spans, extraction emits `debug` events.
//!
//! ### Span Naming Convention
//!
//! - `ImapOtpClient::connect` - Client connection
//! - `ImapOtpClient::fetch_messages` - Search and fetch
//! - `ImapOtpClient::latest_otp` - Fetch and classify
//! - `ImapOtpClient::logout` - Logout
//! - `fetch_latest_otp` - One-shot lookup
//! - `TokenClient::exchange` - OAuth2 refresh
//! - `session::authenticate` - IMAP authentication
//! - `connection::establish_tls` - TLS connection
//!
//! ### Standard Fields
//!
//! - `email` - Email address
//! - `imap_host` - IMAP server hostname
//! - `mechanism` - `LOGIN` or `XOAUTH2`
//! - `uid` - Email UID
//!
//! Enable the `observability` feature for OpenTelemetry integration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod collector;
pub mod config;
pub mod error;
pub mod extractor;
pub mod html;
pub mod message;
pub mod token;

// Internal modules
mod client;
mod connection;
mod parser;
mod session;

// Re-exports for ergonomic API
pub use client::{fetch_latest_otp, ImapOtpClient, OtpLookup};
pub use collector::CodeCollector;
pub use config::{Credentials, FetchConfig, ImapConfig, ImapConfigBuilder, TimeoutConfig};
pub use email_address::EmailAddress;
pub use error::{Error, ErrorCategory, Result};
pub use extractor::{IgnoreList, OtpExtractor};
pub use message::{
    ClassificationResult, CodeCollection, ExtractionResult, InboxRow, InboxSummary,
    MessageContent, MessageRecord, OtpStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _ = ImapConfig::builder();
        let _ = OtpExtractor::default();
        let _ = CodeCollector::default();
        let _ = token::OAuthConfig::new("client", "refresh");
    }

    #[test]
    fn test_extractors_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OtpExtractor>();
        assert_send_sync::<CodeCollector>();
    }
}
