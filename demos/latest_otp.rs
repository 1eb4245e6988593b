//! Example: Look up the newest OTP in a mailbox with tracing enabled.
//!
//! # Usage
//!
//! ```bash
//! export EMAIL_ADDRESS="your@outlook.com"
//! # Either an app password...
//! export EMAIL_PASSWORD="your-app-password"
//! # ...or an OAuth2 access token
//! export EMAIL_ACCESS_TOKEN="eyJ0eXAi..."
//! # Optional: sender filter ("" searches the whole mailbox)
//! export OTP_SENDER="Facebook"
//! export RUST_LOG=inbox_otp=debug
//!
//! cargo run --example latest_otp
//! ```

use inbox_otp::{fetch_latest_otp, ClassificationResult, ImapConfig, OtpExtractor};
use std::env;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> inbox_otp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inbox_otp=info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .init();

    let email = env::var("EMAIL_ADDRESS").expect("EMAIL_ADDRESS environment variable required");

    let mut builder = ImapConfig::builder().email(&email);
    builder = match (env::var("EMAIL_ACCESS_TOKEN"), env::var("EMAIL_PASSWORD")) {
        (Ok(token), _) => builder.access_token(token),
        (Err(_), Ok(password)) => builder.password(password),
        _ => panic!("EMAIL_PASSWORD or EMAIL_ACCESS_TOKEN environment variable required"),
    };
    if let Ok(sender) = env::var("OTP_SENDER") {
        builder = builder.sender((!sender.is_empty()).then_some(sender));
    }
    let config = builder.build()?;

    tracing::info!(email = %email, "Looking up latest OTP");

    let lookup = fetch_latest_otp(config, &OtpExtractor::default()).await?;

    match &lookup.result {
        ClassificationResult::Found {
            otp,
            subject,
            received_at,
        } => println!("OTP {otp} from \"{subject}\" received {received_at:?}"),
        ClassificationResult::NoOtp { subject } => {
            println!("No code found; newest message: \"{subject}\"");
        }
        ClassificationResult::NoEmails => println!("No matching messages"),
    }
    println!("Took {:.2}s", lookup.elapsed.as_secs_f64());

    Ok(())
}
