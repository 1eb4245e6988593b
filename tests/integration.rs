//! Integration tests for inbox-otp.
//!
//! The live tests require a real IMAP account and are disabled by default.
//! To run them:
//!
//! ```bash
//! export INBOX_OTP_TEST_EMAIL="your@outlook.com"
//! # Either a password...
//! export INBOX_OTP_TEST_PASSWORD="your-app-password"
//! # ...or an OAuth2 refresh token exchanged before connecting
//! export INBOX_OTP_TEST_CLIENT_ID="9e5f94bc-..."
//! export INBOX_OTP_TEST_REFRESH_TOKEN="M.C5..."
//!
//! cargo test --features integration-tests -- --ignored
//! ```

use inbox_otp::token::{OAuthConfig, TokenClient};
use inbox_otp::{
    fetch_latest_otp, Error, ErrorCategory, ImapConfig, ImapOtpClient, OtpExtractor, OtpStatus,
};
use std::env;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_email() -> Option<String> {
    dotenvy::dotenv().ok();
    env::var("INBOX_OTP_TEST_EMAIL").ok()
}

fn get_test_config() -> Option<ImapConfig> {
    let email = get_test_email()?;
    let password = env::var("INBOX_OTP_TEST_PASSWORD").ok()?;
    ImapConfig::builder()
        .email(email)
        .password(password)
        .sender(None)
        .max_messages(5)
        .build()
        .ok()
}

fn get_test_oauth() -> Option<(String, OAuthConfig)> {
    let email = get_test_email()?;
    let client_id = env::var("INBOX_OTP_TEST_CLIENT_ID").ok()?;
    let refresh_token = env::var("INBOX_OTP_TEST_REFRESH_TOKEN").ok()?;
    Some((email, OAuthConfig::new(client_id, refresh_token)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_connect_and_logout() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut client = ImapOtpClient::connect(config)
        .await
        .expect("Failed to connect");

    assert!(!client.email().is_empty());
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("ImapOtpClient"));
    assert!(!debug_str.contains(&env::var("INBOX_OTP_TEST_PASSWORD").unwrap()));

    client.logout().await.expect("Failed to logout");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_fetch_messages_respects_limit() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut client = ImapOtpClient::connect(config)
        .await
        .expect("Failed to connect");

    let messages = client.fetch_messages().await.expect("Failed to fetch");
    assert!(messages.len() <= 5);
    for message in &messages {
        assert!(!message.subject_or_default().is_empty());
    }

    client.logout().await.expect("Failed to logout");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_fetch_latest_otp() {
    let config = get_test_config().expect("Test config from environment variables");

    let lookup = fetch_latest_otp(config, &OtpExtractor::default())
        .await
        .expect("Lookup failed");

    match lookup.result.status() {
        OtpStatus::Found => {
            let otp = lookup.result.otp().unwrap();
            assert!((5..=8).contains(&otp.len()));
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
        OtpStatus::NoOtp => assert!(lookup.result.subject().is_some()),
        OtpStatus::NoEmails => println!("Mailbox is empty"),
    }
    assert!(lookup.elapsed > Duration::ZERO);
}

#[tokio::test]
#[ignore = "requires real IMAP server and OAuth2 credentials"]
async fn test_oauth_exchange_then_connect() {
    let (email, oauth) = get_test_oauth().expect("OAuth config from environment variables");

    let token = TokenClient::new()
        .expect("HTTP client")
        .exchange(&oauth)
        .await
        .expect("Token exchange failed");

    let config = ImapConfig::builder()
        .email(email)
        .access_token(token.secret())
        .build()
        .expect("valid config");
    assert_eq!(config.credentials().mechanism(), "XOAUTH2");

    let mut client = ImapOtpClient::connect(config)
        .await
        .expect("Failed to connect");
    client.logout().await.expect("Failed to logout");
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires intentionally wrong credentials"]
async fn test_invalid_credentials() {
    let config = ImapConfig::builder()
        .email("test@outlook.com")
        .password("wrong-password")
        .build()
        .expect("valid config structure");

    let err = ImapOtpClient::connect(config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Auth);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_server_fails_fast() {
    let config = ImapConfig::builder()
        .email("test@example.com")
        .password("password")
        .imap_host("localhost")
        .imap_port(1)
        .connect_timeout(Duration::from_secs(2))
        .build()
        .expect("valid config structure");

    let err = ImapOtpClient::connect(config).await.unwrap_err();

    assert!(matches!(
        err,
        Error::TcpConnect { .. } | Error::ConnectTimeout { .. }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_email_format() {
    let result = ImapConfig::builder()
        .email("not-an-email")
        .password("password")
        .build();

    assert!(matches!(result, Err(Error::InvalidEmailFormat { .. })));
}

#[tokio::test]
async fn test_missing_required_fields() {
    // Missing email
    let result = ImapConfig::builder().password("password").build();
    assert!(result.is_err());

    // Missing credentials
    let result = ImapConfig::builder().email("test@example.com").build();
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}

#[tokio::test]
async fn test_token_config_rejected_before_request() {
    let err = TokenClient::new()
        .expect("HTTP client")
        .exchange(&OAuthConfig::new("", "refresh"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidConfig { .. }));
}
