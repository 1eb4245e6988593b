//! Example: Refresh a Microsoft OAuth2 token, then read the OTP over IMAP.
//!
//! # Usage
//!
//! ```bash
//! export EMAIL_ADDRESS="your@hotmail.com"
//! export OAUTH_CLIENT_ID="9e5f94bc-e8a4-4e73-b8be-63364c29d753"
//! export OAUTH_REFRESH_TOKEN="M.C5..."
//!
//! cargo run --example oauth_otp
//! ```

use inbox_otp::token::{OAuthConfig, TokenClient};
use inbox_otp::{ImapConfig, ImapOtpClient, OtpExtractor};
use std::env;

#[tokio::main]
async fn main() -> inbox_otp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inbox_otp=info")),
        )
        .init();

    let email = env::var("EMAIL_ADDRESS").expect("EMAIL_ADDRESS environment variable required");
    let client_id =
        env::var("OAUTH_CLIENT_ID").expect("OAUTH_CLIENT_ID environment variable required");
    let refresh_token =
        env::var("OAUTH_REFRESH_TOKEN").expect("OAUTH_REFRESH_TOKEN environment variable required");

    let token = TokenClient::new()?
        .exchange(&OAuthConfig::new(client_id, refresh_token))
        .await?;

    println!("Access token valid for {:?}", token.expires_in);
    if token.refresh_token().is_some() {
        println!("Server rotated the refresh token; store the new one");
    }

    let config = ImapConfig::builder()
        .email(email)
        .access_token(token.secret())
        .build()?;

    let mut client = ImapOtpClient::connect(config).await?;
    let result = client.latest_otp(&OtpExtractor::default()).await?;
    client.logout().await?;

    match result.otp() {
        Some(otp) => println!("OTP: {otp}"),
        None => println!("Status: {}", result.status()),
    }

    Ok(())
}
