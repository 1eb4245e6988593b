//! Configuration for the IMAP passcode client.
//!
//! Use [`ImapConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use inbox_otp::ImapConfig;
//!
//! let config = ImapConfig::builder()
//!     .email("user@hotmail.com")
//!     .access_token("eyJ0eXAi...")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.effective_imap_host(), "outlook.office365.com");
//! ```

use crate::error::{Error, Result};
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// How the client proves its identity to the IMAP server.
#[derive(Clone)]
pub enum Credentials {
    /// Plain `LOGIN` with a password or app-specific password.
    Password(SecretString),
    /// `AUTHENTICATE XOAUTH2` with an OAuth2 access token.
    AccessToken(SecretString),
}

impl Credentials {
    /// Returns the SASL mechanism name used for these credentials.
    #[must_use]
    pub fn mechanism(&self) -> &'static str {
        match self {
            Credentials::Password(_) => "LOGIN",
            Credentials::AccessToken(_) => "XOAUTH2",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password(_) => f.write_str("Password([REDACTED])"),
            Credentials::AccessToken(_) => f.write_str("AccessToken([REDACTED])"),
        }
    }
}

/// Configuration for connecting to an IMAP server.
///
/// Create using [`ImapConfig::builder()`].
///
/// Credentials are stored as [`SecretString`] to prevent accidental logging.
#[derive(Clone)]
pub struct ImapConfig {
    email: EmailAddress,
    credentials: Credentials,
    /// IMAP server hostname (discovered from email domain if not set).
    pub imap_host: Option<String>,
    /// IMAP server port (default: 993 for IMAPS).
    pub imap_port: u16,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Which messages to fetch.
    pub fetch: FetchConfig,
}

impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("email", &self.email.as_str())
            .field("credentials", &self.credentials)
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("timeouts", &self.timeouts)
            .field("fetch", &self.fetch)
            .finish()
    }
}

impl ImapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ImapConfigBuilder {
        ImapConfigBuilder::default()
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the secret half of the credentials.
    ///
    /// Use this only when handing the secret to the IMAP session.
    #[must_use]
    pub(crate) fn secret(&self) -> &str {
        match &self.credentials {
            Credentials::Password(s) | Credentials::AccessToken(s) => s.expose_secret(),
        }
    }

    /// Returns the effective IMAP host, either explicitly configured or derived from email domain.
    #[must_use]
    pub fn effective_imap_host(&self) -> String {
        match &self.imap_host {
            Some(host) => host.clone(),
            None => discover_imap_host(self.email.as_str()),
        }
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.effective_imap_host(), self.imap_port)
    }
}

/// Derives the IMAP host from an email address.
///
/// Microsoft consumer domains all land on the Office 365 endpoint; unknown
/// domains fall back to `imap.{domain}`.
///
/// ```
/// use inbox_otp::config::discover_imap_host;
///
/// assert_eq!(discover_imap_host("someone@Outlook.com"), "outlook.office365.com");
/// assert_eq!(discover_imap_host("someone@example.org"), "imap.example.org");
/// ```
#[must_use]
pub fn discover_imap_host(email: &str) -> String {
    let domain = email
        .rsplit_once('@')
        .map_or(email, |(_, domain)| domain)
        .to_lowercase();

    let known = match domain.as_str() {
        "hotmail.com" | "hotmail.co.uk" | "hotmail.fr" | "outlook.com" | "outlook.fr"
        | "live.com" | "live.fr" | "msn.com" => Some("outlook.office365.com"),
        "gmail.com" | "googlemail.com" => Some("imap.gmail.com"),
        "yahoo.com" => Some("imap.mail.yahoo.com"),
        "icloud.com" | "me.com" | "mac.com" => Some("imap.mail.me.com"),
        _ => None,
    };

    known.map_or_else(|| format!("imap.{domain}"), str::to_string)
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for selecting a mailbox.
    pub select: Duration,
    /// Timeout for the UID search.
    pub search: Duration,
    /// Timeout for fetching one message.
    pub message_fetch: Duration,
    /// Timeout for logout operation.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            search: Duration::from_secs(10),
            message_fetch: Duration::from_secs(30),
            logout: Duration::from_secs(5),
        }
    }
}

/// Which messages the client pulls from the server.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Mailbox to select.
    pub mailbox: String,
    /// Only messages whose `From` contains this text; `None` fetches everything.
    pub sender: Option<String>,
    /// How many of the newest matching messages to fetch.
    pub max_messages: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mailbox: "INBOX".to_string(),
            sender: Some("Facebook".to_string()),
            max_messages: 20,
        }
    }
}

fn validate_email(email: &str) -> Result<EmailAddress> {
    EmailAddress::parse_with_options(email, email_address::Options::default()).map_err(|_| {
        Error::InvalidEmailFormat {
            email: email.to_string(),
        }
    })
}

/// Builder for [`ImapConfig`].
#[derive(Debug, Default)]
pub struct ImapConfigBuilder {
    email: Option<String>,
    credentials: Option<Credentials>,
    imap_host: Option<String>,
    imap_port: Option<u16>,
    timeouts: Option<TimeoutConfig>,
    fetch: Option<FetchConfig>,
}

impl ImapConfigBuilder {
    /// Sets the email address (required).
    ///
    /// The email domain is used to discover the IMAP server if not explicitly set.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Authenticates with `LOGIN` and this password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Password(SecretString::from(password.into())));
        self
    }

    /// Authenticates with `XOAUTH2` and this access token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::AccessToken(SecretString::from(token.into())));
        self
    }

    /// Sets the IMAP server hostname explicitly.
    #[must_use]
    pub fn imap_host(mut self, host: impl Into<String>) -> Self {
        self.imap_host = Some(host.into());
        self
    }

    /// Sets the IMAP server port (default 993).
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Sets the fetch window.
    #[must_use]
    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Restricts fetching to messages from `sender`; `None` fetches all.
    #[must_use]
    pub fn sender(mut self, sender: Option<String>) -> Self {
        self.fetch.get_or_insert_with(FetchConfig::default).sender = sender;
        self
    }

    /// Sets how many of the newest messages to fetch.
    #[must_use]
    pub fn max_messages(mut self, count: usize) -> Self {
        self.fetch
            .get_or_insert_with(FetchConfig::default)
            .max_messages = count;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is missing or malformed, no credentials
    /// were given, or `max_messages` is zero.
    pub fn build(self) -> Result<ImapConfig> {
        let email_raw = self.email.ok_or_else(|| Error::InvalidConfig {
            message: "email is required".into(),
        })?;
        let email = validate_email(&email_raw)?;

        let credentials = self.credentials.ok_or_else(|| Error::InvalidConfig {
            message: "password or access token is required".into(),
        })?;

        let fetch = self.fetch.unwrap_or_default();
        if fetch.max_messages == 0 {
            return Err(Error::InvalidConfig {
                message: "max_messages must be at least 1".into(),
            });
        }

        Ok(ImapConfig {
            email,
            credentials,
            imap_host: self.imap_host,
            imap_port: self.imap_port.unwrap_or(993),
            timeouts: self.timeouts.unwrap_or_default(),
            fetch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = ImapConfig::builder()
            .email("user@example.com")
            .password("secret")
            .build()
            .unwrap();

        assert_eq!(config.email(), "user@example.com");
        assert_eq!(config.secret(), "secret");
        assert_eq!(config.credentials().mechanism(), "LOGIN");
        assert_eq!(config.imap_port, 993);
        assert_eq!(config.fetch.mailbox, "INBOX");
        assert_eq!(config.fetch.sender.as_deref(), Some("Facebook"));
        assert_eq!(config.fetch.max_messages, 20);
    }

    #[test]
    fn test_builder_access_token() {
        let config = ImapConfig::builder()
            .email("user@hotmail.com")
            .access_token("token-value")
            .max_messages(40)
            .sender(None)
            .build()
            .unwrap();

        assert_eq!(config.credentials().mechanism(), "XOAUTH2");
        assert_eq!(config.secret(), "token-value");
        assert_eq!(config.fetch.max_messages, 40);
        assert!(config.fetch.sender.is_none());
        assert_eq!(config.server_address(), "outlook.office365.com:993");
    }

    #[test]
    fn test_last_credentials_win() {
        let config = ImapConfig::builder()
            .email("user@example.com")
            .password("secret")
            .access_token("token")
            .build()
            .unwrap();
        assert_eq!(config.credentials().mechanism(), "XOAUTH2");
    }

    #[test]
    fn test_builder_missing_fields() {
        assert!(ImapConfig::builder().password("secret").build().is_err());
        assert!(ImapConfig::builder().email("user@example.com").build().is_err());
    }

    #[test]
    fn test_builder_invalid_email() {
        let result = ImapConfig::builder()
            .email("invalid-email")
            .password("secret")
            .build();
        assert!(matches!(result, Err(Error::InvalidEmailFormat { .. })));
    }

    #[test]
    fn test_builder_zero_messages() {
        let result = ImapConfig::builder()
            .email("user@example.com")
            .password("secret")
            .max_messages(0)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_explicit_host() {
        let config = ImapConfig::builder()
            .email("user@hotmail.com")
            .password("secret")
            .imap_host("imap-mail.outlook.com")
            .imap_port(994)
            .connect_timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.server_address(), "imap-mail.outlook.com:994");
        assert_eq!(config.timeouts.connect, Duration::from_secs(60));
    }

    #[test]
    fn test_discover_imap_host() {
        assert_eq!(discover_imap_host("a@hotmail.com"), "outlook.office365.com");
        assert_eq!(discover_imap_host("a@LIVE.com"), "outlook.office365.com");
        assert_eq!(discover_imap_host("a@gmail.com"), "imap.gmail.com");
        assert_eq!(discover_imap_host("a@unknown.org"), "imap.unknown.org");
    }

    #[test]
    fn test_secrets_not_in_debug() {
        let config = ImapConfig::builder()
            .email("user@example.com")
            .access_token("super-secret-token")
            .build()
            .unwrap();

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-token"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
