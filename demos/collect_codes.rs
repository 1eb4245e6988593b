//! Example: Collect every confirmation code from scraped inbox rows.
//!
//! A browser-driven scraper would produce the [`InboxSummary`]; here it is
//! built by hand.
//!
//! ```bash
//! cargo run --example collect_codes
//! ```

use inbox_otp::{CodeCollector, InboxRow, InboxSummary};
use std::time::Duration;

fn main() {
    let summary = InboxSummary {
        rows: vec![
            InboxRow::new(
                "Facebook",
                "48213 is your confirmation code",
                "Confirmation code 48213. Don't share it.",
            ),
            InboxRow::new("Shop", "Order 777777 shipped", "Tracking 123456789"),
            InboxRow::new(
                "Meta",
                "Your Meta confirmation code",
                "Use 5531206 to confirm your account",
            ),
        ],
        first_body: Some("Hi, FB-48213 is your confirmation code.".into()),
        errors: Vec::new(),
        duration: Some(Duration::from_millis(2300)),
    };

    let collected = CodeCollector::default().summarize(&summary);

    println!("Codes: {:?}", collected.codes);
    if let Some(duration) = collected.duration {
        println!("Scrape took {:.1}s", duration.as_secs_f64());
    }
}
