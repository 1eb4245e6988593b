//! Collect-all extraction over scraped inbox listings.
//!
//! Unlike [`OtpExtractor`](crate::extractor::OtpExtractor), which picks one
//! authoritative code per message list, [`CodeCollector`] gathers every
//! distinct code from the rows that look like confirmation mails from the
//! expected sender, plus whatever the newest message body holds.
//!
//! ```
//! use inbox_otp::collector::CodeCollector;
//! use inbox_otp::message::InboxRow;
//!
//! let rows = [
//!     InboxRow::new("Facebook", "123456 is your confirmation code", "Confirmation code 654321"),
//!     InboxRow::new("Shop", "Order 777777", "confirmation code 888888"),
//! ];
//! let collected = CodeCollector::default().collect_codes(&rows, None);
//! assert_eq!(collected.codes, ["123456", "654321"]);
//! ```

use crate::extractor::{digit_runs, IgnoreList};
use crate::message::{CodeCollection, InboxRow, InboxSummary};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::debug;

/// Keywords identifying the sender brand.
pub const DEFAULT_IDENTITY_KEYWORDS: [&str; 2] = ["facebook", "meta"];

/// Keywords identifying a confirmation mail.
pub const DEFAULT_CONFIRMATION_KEYWORDS: [&str; 1] = ["confirmation code"];

/// Accepted code lengths for collect-all extraction.
pub const COLLECT_CODE_LENGTHS: RangeInclusive<usize> = 5..=9;

/// Gathers every distinct code from the relevant rows of an inbox listing.
#[derive(Debug, Clone)]
pub struct CodeCollector {
    identity_keywords: Vec<String>,
    confirmation_keywords: Vec<String>,
    ignore: IgnoreList,
    lengths: RangeInclusive<usize>,
}

impl Default for CodeCollector {
    fn default() -> Self {
        Self::new(IgnoreList::default())
    }
}

impl CodeCollector {
    /// Creates a collector with the default keyword groups and the given
    /// ignore-list.
    #[must_use]
    pub fn new(ignore: IgnoreList) -> Self {
        Self {
            identity_keywords: to_lowercase_all(DEFAULT_IDENTITY_KEYWORDS),
            confirmation_keywords: to_lowercase_all(DEFAULT_CONFIRMATION_KEYWORDS),
            ignore,
            lengths: COLLECT_CODE_LENGTHS,
        }
    }

    /// Replaces the sender identity keywords.
    #[must_use]
    pub fn with_identity_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.identity_keywords = to_lowercase_all(keywords);
        self
    }

    /// Replaces the confirmation keywords.
    #[must_use]
    pub fn with_confirmation_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.confirmation_keywords = to_lowercase_all(keywords);
        self
    }

    /// Replaces the ignore-list.
    #[must_use]
    pub fn with_ignore_list(mut self, ignore: IgnoreList) -> Self {
        self.ignore = ignore;
        self
    }

    /// Returns `true` if the row passes both keyword filters.
    #[must_use]
    pub fn is_relevant(&self, row: &InboxRow) -> bool {
        let combined = format!("{} {} {}", row.sender, row.subject, row.snippet).to_lowercase();
        let has_any = |keywords: &[String]| keywords.iter().any(|k| combined.contains(k.as_str()));
        has_any(&self.identity_keywords) && has_any(&self.confirmation_keywords)
    }

    /// Collects codes from the relevant rows, then from `first_body`.
    ///
    /// Within a row the subject is scanned before the snippet. The body is
    /// scanned whether or not any row was relevant.
    #[must_use]
    pub fn collect_codes(&self, rows: &[InboxRow], first_body: Option<&str>) -> CodeCollection {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();

        let relevant = rows.iter().filter(|row| self.is_relevant(row));
        let row_fields = relevant.flat_map(|row| [row.subject.as_str(), row.snippet.as_str()]);

        for source in row_fields.chain(first_body) {
            for run in digit_runs(source, self.lengths.clone()) {
                if !self.ignore.contains(run.value) && seen.insert(run.value) {
                    codes.push(run.value.to_string());
                }
            }
        }

        debug!(
            row_count = rows.len(),
            code_count = codes.len(),
            "Collected confirmation codes"
        );

        CodeCollection {
            codes,
            errors: Vec::new(),
            duration: None,
        }
    }

    /// Collects codes from a scraper's summary, passing its errors and
    /// duration through.
    #[must_use]
    pub fn summarize(&self, summary: &InboxSummary) -> CodeCollection {
        let collected = self.collect_codes(&summary.rows, summary.first_body.as_deref());
        CodeCollection {
            errors: summary.errors.clone(),
            duration: summary.duration,
            ..collected
        }
    }
}

fn to_lowercase_all<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fb_row(subject: &str, snippet: &str) -> InboxRow {
        InboxRow::new("Facebook", subject, snippet)
    }

    #[test]
    fn test_relevance_needs_both_keyword_groups() {
        let collector = CodeCollector::default();
        assert!(collector.is_relevant(&fb_row("Confirmation code", "")));
        assert!(collector.is_relevant(&InboxRow::new("Meta", "", "Your CONFIRMATION CODE")));
        assert!(!collector.is_relevant(&fb_row("Welcome", "New login")));
        assert!(!collector.is_relevant(&InboxRow::new("Bank", "confirmation code", "")));
    }

    #[test]
    fn test_identity_may_come_from_snippet() {
        let collector = CodeCollector::default();
        let row = InboxRow::new("noreply", "confirmation code 123456", "sent by facebook");
        assert!(collector.is_relevant(&row));
    }

    #[test]
    fn test_collects_nine_digit_codes() {
        let collector = CodeCollector::default();
        let collected = collector.collect_codes(&[fb_row("confirmation code 123456789", "")], None);
        assert_eq!(collected.codes, ["123456789"]);
    }

    #[test]
    fn test_deduplicates_in_first_seen_order() {
        let collector = CodeCollector::default();
        let rows = [
            fb_row("Confirmation code 222222", "code 111111 and 222222"),
            fb_row("Confirmation code 111111", "333333"),
        ];
        let collected = collector.collect_codes(&rows, Some("Your code 333333 or 444444"));
        assert_eq!(collected.codes, ["222222", "111111", "333333", "444444"]);
    }

    #[test]
    fn test_ignored_codes_skipped_everywhere() {
        let collector = CodeCollector::default();
        let collected =
            collector.collect_codes(&[fb_row("Confirmation code 94025", "")], Some("94025"));
        assert!(collected.codes.is_empty());
    }

    #[test]
    fn test_body_scanned_without_relevant_rows() {
        let collector = CodeCollector::default();
        let rows = [InboxRow::new("Shop", "Sale", "50% off")];
        let collected = collector.collect_codes(&rows, Some("FB-76543210"));
        assert_eq!(collected.codes, ["76543210"]);
    }

    #[test]
    fn test_empty_body_ignored() {
        let collector = CodeCollector::default();
        assert!(collector.collect_codes(&[], Some("")).codes.is_empty());
        assert!(collector.collect_codes(&[], None).codes.is_empty());
    }

    #[test]
    fn test_custom_keywords() {
        let collector = CodeCollector::default()
            .with_identity_keywords(["Instagram"])
            .with_confirmation_keywords(["security code"]);
        let rows = [
            fb_row("Confirmation code 111111", ""),
            InboxRow::new("Instagram", "Security Code", "55555"),
        ];
        assert_eq!(collector.collect_codes(&rows, None).codes, ["55555"]);
    }

    #[test]
    fn test_empty_keywords_match_nothing() {
        let collector = CodeCollector::default().with_identity_keywords([""]);
        assert!(!collector.is_relevant(&fb_row("Confirmation code 121212", "")));

        let collector = CodeCollector::default().with_confirmation_keywords(["", "security code"]);
        assert!(!collector.is_relevant(&fb_row("Welcome 121212", "")));
        assert!(collector.is_relevant(&fb_row("Security code 121212", "")));
    }

    #[test]
    fn test_summarize_passes_through() {
        let collector = CodeCollector::default();
        let summary = InboxSummary {
            rows: vec![fb_row("Confirmation code 121212", "")],
            first_body: None,
            errors: vec!["Timed out waiting for the first email body.".into()],
            duration: Some(Duration::from_millis(1500)),
        };
        let collected = collector.summarize(&summary);
        assert_eq!(collected.codes, ["121212"]);
        assert_eq!(collected.errors, summary.errors);
        assert_eq!(collected.duration, Some(Duration::from_millis(1500)));
    }
}
