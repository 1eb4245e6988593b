//! Error types for the inbox-otp crate.
//!
//! Only the mailbox and token plumbing can fail. Extraction itself never
//! returns an error: "no code" and "no messages" are ordinary results.
//! Errors are categorized by their retryability - see [`Error::is_retryable`].

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching mail or exchanging tokens.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid email address format.
    #[error("invalid email format: {email}")]
    InvalidEmailFormat {
        /// The invalid email address.
        email: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network / connection errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Timeout errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Authentication timeout.
    #[error("authentication timeout for {email} after {timeout:?}")]
    AuthTimeout {
        /// The email address used for authentication.
        email: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Mailbox selection timeout.
    #[error("mailbox selection timeout for '{mailbox}' after {timeout:?}")]
    SelectTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Search timeout.
    #[error("search timeout after {timeout:?}")]
    SearchTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Message fetch timeout.
    #[error("message fetch timeout for UID {uid} after {timeout:?}")]
    FetchTimeout {
        /// The UID being fetched.
        uid: u32,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Logout timeout (not critical).
    #[error("logout timeout after {timeout:?}")]
    LogoutTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP password login failed.
    #[error("IMAP login failed for {email}")]
    ImapLogin {
        /// The email address used for login.
        email: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP XOAUTH2 authentication failed.
    #[error("IMAP XOAUTH2 authentication failed for {email}")]
    ImapAuthenticate {
        /// The email address used for authentication.
        email: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to select mailbox.
    #[error("failed to select mailbox '{mailbox}'")]
    SelectMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP search failed.
    #[error("IMAP search failed for query {query}")]
    ImapSearch {
        /// The search query.
        query: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP fetch failed.
    #[error("IMAP fetch failed for UID {uid}")]
    ImapFetch {
        /// The UID that failed.
        uid: u32,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to fetch message from stream.
    #[error("failed to fetch message from stream")]
    FetchMessage {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // OAuth2 token exchange errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The token request could not be completed.
    #[error("token request to {url} failed after {attempts} attempt(s)")]
    TokenRequest {
        /// The token endpoint.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token exchange failed: {status} {body}")]
    TokenStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The token endpoint answered without an access token.
    #[error("no access_token in token response")]
    MissingAccessToken,

    /// The token response body was not valid JSON.
    #[error("failed to decode token response")]
    TokenResponse {
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    ///
    /// ```
    /// use inbox_otp::Error;
    ///
    /// assert!(Error::TokenStatus { status: 503, body: String::new() }.is_retryable());
    /// assert!(!Error::TokenStatus { status: 400, body: String::new() }.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::SearchTimeout { .. }
            | Error::FetchTimeout { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::TokenRequest { .. } => true,

            Error::TokenStatus { status, .. } => *status >= 500,

            // Rejected credentials stay rejected.
            Error::InvalidEmailFormat { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::LogoutTimeout { .. }
            | Error::ImapLogin { .. }
            | Error::ImapAuthenticate { .. }
            | Error::ImapLogout { .. }
            | Error::MissingAccessToken
            | Error::TokenResponse { .. } => false,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidEmailFormat { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. } => ErrorCategory::Configuration,

            Error::TcpConnect { .. } | Error::TlsConnect { .. } | Error::TokenRequest { .. } => {
                ErrorCategory::Network
            }

            Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::SearchTimeout { .. }
            | Error::FetchTimeout { .. }
            | Error::LogoutTimeout { .. } => ErrorCategory::Timeout,

            Error::SelectMailbox { .. }
            | Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::ImapLogout { .. } => ErrorCategory::Protocol,

            Error::ImapLogin { .. }
            | Error::ImapAuthenticate { .. }
            | Error::TokenStatus { .. }
            | Error::MissingAccessToken => ErrorCategory::Auth,

            Error::TokenResponse { .. } => ErrorCategory::Parse,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Network connectivity errors.
    Network,
    /// Timeout errors.
    Timeout,
    /// IMAP protocol errors.
    Protocol,
    /// Credential or token errors.
    Auth,
    /// Response decoding errors.
    Parse,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Auth => write!(f, "auth"),
            ErrorCategory::Parse => write!(f, "parse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let err = Error::InvalidEmailFormat {
            email: "bad".into(),
        };
        assert!(!err.is_retryable());

        let err = Error::TcpConnect {
            target: "outlook.office365.com:993".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.is_retryable());

        let err = Error::FetchTimeout {
            uid: 42,
            timeout: Duration::from_secs(30),
        };
        assert!(err.is_retryable());

        assert!(!Error::MissingAccessToken.is_retryable());
    }

    #[test]
    fn test_token_status_retryability() {
        let server = Error::TokenStatus {
            status: 502,
            body: "bad gateway".into(),
        };
        let client = Error::TokenStatus {
            status: 400,
            body: "invalid_grant".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert_eq!(client.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_error_categories() {
        let err = Error::InvalidConfig {
            message: "password or access token is required".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = Error::ConnectTimeout {
            target: "imap.gmail.com:993".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.category(), ErrorCategory::Timeout);

        assert_eq!(Error::MissingAccessToken.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::Auth.to_string(), "auth");
    }

    #[test]
    fn test_token_status_message() {
        let err = Error::TokenStatus {
            status: 400,
            body: "invalid_grant".into(),
        };
        assert_eq!(err.to_string(), "token exchange failed: 400 invalid_grant");
    }
}
