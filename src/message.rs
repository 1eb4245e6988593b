//! Message records handed to the extractors and the results they produce.
//!
//! Records are plain data: a mailbox fetcher (the IMAP client in this crate,
//! or an external inbox scraper) builds them, and the extractors only read
//! them.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Subject used when a message has none.
pub const NO_SUBJECT: &str = "(no subject)";

/// Body content of a message.
///
/// At least one of the fields is expected to be populated. Plain text is
/// preferred over HTML when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContent {
    /// `text/plain` body.
    pub text: String,
    /// `text/html` body, undecoded.
    pub html: String,
}

/// A single message as supplied by a mailbox fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRecord {
    /// Subject line; may be empty.
    pub subject: String,
    /// Body content.
    pub content: MessageContent,
    /// When the message was received, if known.
    pub received_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    /// Creates a record with a plain-text body.
    #[must_use]
    pub fn text(subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            content: MessageContent {
                text: text.into(),
                html: String::new(),
            },
            received_at: None,
        }
    }

    /// Creates a record with an HTML body only.
    #[must_use]
    pub fn html(subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            content: MessageContent {
                text: String::new(),
                html: html.into(),
            },
            received_at: None,
        }
    }

    /// Sets the receive time.
    #[must_use]
    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = Some(at);
        self
    }

    /// Returns the subject, or [`NO_SUBJECT`] when it is empty.
    #[must_use]
    pub fn subject_or_default(&self) -> &str {
        if self.subject.is_empty() {
            NO_SUBJECT
        } else {
            &self.subject
        }
    }
}

/// Outcome of running the extractor over one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// The code, if one was found in the subject or body.
    pub otp: Option<String>,
    /// Subject of the message, defaulted to [`NO_SUBJECT`].
    pub subject: String,
    /// Receive time of the message.
    pub received_at: Option<DateTime<Utc>>,
}

/// Status reported by [`ClassificationResult::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpStatus {
    /// A message carried a code.
    Found,
    /// Messages were present but none carried a code.
    NoOtp,
    /// There were no messages at all.
    NoEmails,
}

impl fmt::Display for OtpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpStatus::Found => write!(f, "found"),
            OtpStatus::NoOtp => write!(f, "no_otp"),
            OtpStatus::NoEmails => write!(f, "no_emails"),
        }
    }
}

/// Outcome of classifying a list of messages.
///
/// Each variant carries exactly the fields that are meaningful for its
/// status; use the accessors for a uniform view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    /// The first message carrying a code.
    Found {
        /// The extracted code.
        otp: String,
        /// Subject of the message the code came from.
        subject: String,
        /// Receive time of that message.
        received_at: Option<DateTime<Utc>>,
    },
    /// No message carried a code.
    NoOtp {
        /// Subject of the first message in the list.
        subject: String,
    },
    /// The message list was empty.
    NoEmails,
}

impl ClassificationResult {
    /// Returns the status of this result.
    #[must_use]
    pub fn status(&self) -> OtpStatus {
        match self {
            ClassificationResult::Found { .. } => OtpStatus::Found,
            ClassificationResult::NoOtp { .. } => OtpStatus::NoOtp,
            ClassificationResult::NoEmails => OtpStatus::NoEmails,
        }
    }

    /// Returns the code when the status is [`OtpStatus::Found`].
    #[must_use]
    pub fn otp(&self) -> Option<&str> {
        match self {
            ClassificationResult::Found { otp, .. } => Some(otp),
            _ => None,
        }
    }

    /// Returns the subject carried by the result, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            ClassificationResult::Found { subject, .. }
            | ClassificationResult::NoOtp { subject } => Some(subject),
            ClassificationResult::NoEmails => None,
        }
    }

    /// Returns the receive time of the message the code came from.
    #[must_use]
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ClassificationResult::Found { received_at, .. } => *received_at,
            _ => None,
        }
    }
}

/// One row of a scraped webmail inbox listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxRow {
    /// Sender display name or address.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Preview snippet shown next to the subject.
    pub snippet: String,
    /// Time column as rendered by the webmail UI.
    pub time: String,
}

impl InboxRow {
    /// Creates a row with an empty time column.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            snippet: snippet.into(),
            time: String::new(),
        }
    }
}

/// Everything an inbox scraper reports for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxSummary {
    /// Inbox rows in display order.
    pub rows: Vec<InboxRow>,
    /// Full body text of the first (newest) message, if it could be opened.
    pub first_body: Option<String>,
    /// Problems the scraper hit along the way.
    pub errors: Vec<String>,
    /// Wall time the scrape took.
    pub duration: Option<Duration>,
}

/// Codes gathered from an inbox summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeCollection {
    /// Distinct codes in first-seen order.
    pub codes: Vec<String>,
    /// Errors passed through from the fetcher.
    pub errors: Vec<String>,
    /// Fetch duration passed through from the fetcher.
    pub duration: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_default() {
        assert_eq!(MessageRecord::text("", "body").subject_or_default(), NO_SUBJECT);
        assert_eq!(MessageRecord::text("Hi", "body").subject_or_default(), "Hi");
    }

    #[test]
    fn test_classification_accessors() {
        let found = ClassificationResult::Found {
            otp: "123456".into(),
            subject: "Code".into(),
            received_at: None,
        };
        assert_eq!(found.status(), OtpStatus::Found);
        assert_eq!(found.otp(), Some("123456"));
        assert_eq!(found.subject(), Some("Code"));

        let no_otp = ClassificationResult::NoOtp {
            subject: "hi".into(),
        };
        assert_eq!(no_otp.status(), OtpStatus::NoOtp);
        assert_eq!(no_otp.otp(), None);
        assert_eq!(no_otp.received_at(), None);

        let none = ClassificationResult::NoEmails;
        assert_eq!(none.status(), OtpStatus::NoEmails);
        assert_eq!(none.subject(), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OtpStatus::Found.to_string(), "found");
        assert_eq!(OtpStatus::NoOtp.to_string(), "no_otp");
        assert_eq!(OtpStatus::NoEmails.to_string(), "no_emails");
    }
}
