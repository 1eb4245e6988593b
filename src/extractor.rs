//! One-time passcode extraction from free-form email text.
//!
//! [`OtpExtractor`] decides whether a subject or body carries a passcode and,
//! when several numbers compete, which one is authoritative. Rules are tried
//! in order and the first one yielding a code that is not ignore-listed wins:
//!
//! 1. a code directly preceded by the marker (`FB-123456`);
//! 2. the first code after a confirmation keyword (`Your code: 123456`);
//! 3. the longest code anywhere in the text, earliest on ties.
//!
//! # Example
//!
//! ```
//! use inbox_otp::extractor::OtpExtractor;
//! use inbox_otp::message::MessageRecord;
//!
//! let extractor = OtpExtractor::default();
//! assert_eq!(
//!     extractor.extract_candidate("Ticket 55555. FB-482913 is your code"),
//!     Some("482913")
//! );
//!
//! let result = extractor.classify(&[MessageRecord::text("Login", "Your code: 771204")]);
//! assert_eq!(result.otp(), Some("771204"));
//! ```

use crate::html::decode_entities;
use crate::message::{ClassificationResult, ExtractionResult, MessageRecord};
use std::borrow::Cow;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::debug;

/// Code that shows up in notification footers and is never a passcode.
pub const DEFAULT_IGNORED_CODE: &str = "94025";

/// Marker the notifications put in front of a code.
pub const DEFAULT_MARKER: &str = "FB-";

/// Confirmation phrases, in the order they are tried.
pub const DEFAULT_KEYWORDS: [&str; 5] = [
    "confirmation code:",
    "your code:",
    "your confirmation code:",
    "here's your confirmation code:",
    "verification code:",
];

/// Accepted code lengths for single-best extraction.
pub const DEFAULT_CODE_LENGTHS: RangeInclusive<usize> = 5..=8;

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// A standalone run of ASCII digits located in a text.
///
/// Offsets are byte offsets into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitRun<'a> {
    /// The digits.
    pub value: &'a str,
    /// Offset of the first digit.
    pub start: usize,
    /// Offset one past the last digit.
    pub end: usize,
}

/// Returns `true` for characters that glue a digit to its neighbours.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Iterates the standalone digit runs in `text` whose length lies in `lengths`.
///
/// A run is standalone when it is a whole word: the characters on either side
/// are not letters, digits or underscores. `"A1234567"` and `"123456789"`
/// therefore yield nothing for lengths `5..=8`.
///
/// ```
/// use inbox_otp::extractor::digit_runs;
///
/// let runs: Vec<_> = digit_runs("id 12345, ref A99999, 2024-06-01, 482913.", 5..=8)
///     .map(|run| run.value)
///     .collect();
/// assert_eq!(runs, ["12345", "482913"]);
/// ```
pub fn digit_runs(text: &str, lengths: RangeInclusive<usize>) -> DigitRuns<'_> {
    DigitRuns {
        text,
        pos: 0,
        lengths,
    }
}

/// Iterator returned by [`digit_runs`].
#[derive(Debug, Clone)]
pub struct DigitRuns<'a> {
    text: &'a str,
    pos: usize,
    lengths: RangeInclusive<usize>,
}

impl<'a> Iterator for DigitRuns<'a> {
    type Item = DigitRun<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];

            // Skip to the start of the next word.
            let Some(word_offset) = rest.find(is_word_char) else {
                self.pos = self.text.len();
                return None;
            };
            let start = self.pos + word_offset;
            let word_len = self.text[start..]
                .find(|c: char| !is_word_char(c))
                .unwrap_or(self.text.len() - start);
            let end = start + word_len;
            self.pos = end;

            let word = &self.text[start..end];
            if word.bytes().all(|b| b.is_ascii_digit()) && self.lengths.contains(&word.len()) {
                return Some(DigitRun {
                    value: word,
                    start,
                    end,
                });
            }
        }
        None
    }
}

/// Finds the first ASCII-case-insensitive occurrence of `needle` in `haystack`.
pub(crate) fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

// ─────────────────────────────────────────────────────────────────────────────
// Ignore-list
// ─────────────────────────────────────────────────────────────────────────────

/// Codes known to be false positives.
///
/// Immutable once built; extractors hold their own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreList {
    codes: HashSet<String>,
}

impl IgnoreList {
    /// Creates an empty ignore-list.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            codes: HashSet::new(),
        }
    }

    /// Returns `true` if `code` must be skipped.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Number of ignored codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns `true` if nothing is ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for IgnoreList {
    /// The built-in list, holding [`DEFAULT_IGNORED_CODE`].
    fn default() -> Self {
        [DEFAULT_IGNORED_CODE].into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractor
// ─────────────────────────────────────────────────────────────────────────────

/// Picks the single best passcode out of a message.
///
/// Cheap to clone and safe to share between tasks; it holds no mutable state.
#[derive(Debug, Clone)]
pub struct OtpExtractor {
    marker: String,
    keywords: Vec<String>,
    ignore: IgnoreList,
    lengths: RangeInclusive<usize>,
}

impl Default for OtpExtractor {
    fn default() -> Self {
        Self::new(IgnoreList::default())
    }
}

impl OtpExtractor {
    /// Creates an extractor with the default marker and keywords and the
    /// given ignore-list.
    #[must_use]
    pub fn new(ignore: IgnoreList) -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            ignore,
            lengths: DEFAULT_CODE_LENGTHS,
        }
    }

    /// Replaces the prefix marker.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Replaces the confirmation keywords; earlier keywords take priority.
    ///
    /// Empty keywords are dropped.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.is_empty())
            .collect();
        self
    }

    /// Replaces the ignore-list.
    #[must_use]
    pub fn with_ignore_list(mut self, ignore: IgnoreList) -> Self {
        self.ignore = ignore;
        self
    }

    /// Returns the ignore-list in use.
    #[must_use]
    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Returns the best passcode candidate in `text`, if any.
    ///
    /// Never fails: empty strings, markup and garbage all yield `None`.
    #[must_use]
    pub fn extract_candidate<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.prefixed(text)
            .or_else(|| self.keyword_anchored(text))
            .or_else(|| self.longest(text))
    }

    /// Extracts the passcode of one message, subject first.
    #[must_use]
    pub fn parse_message(&self, message: &MessageRecord) -> ExtractionResult {
        let subject = message.subject_or_default();
        let otp = self
            .extract_candidate(subject)
            .map(str::to_owned)
            .or_else(|| {
                let body = body_text(message);
                self.extract_candidate(&body).map(str::to_owned)
            });

        ExtractionResult {
            otp,
            subject: subject.to_string(),
            received_at: message.received_at,
        }
    }

    /// Classifies a list of messages, stopping at the first one with a code.
    #[must_use]
    pub fn classify(&self, messages: &[MessageRecord]) -> ClassificationResult {
        let Some(first) = messages.first() else {
            return ClassificationResult::NoEmails;
        };

        for (index, message) in messages.iter().enumerate() {
            let parsed = self.parse_message(message);
            if let Some(otp) = parsed.otp {
                debug!(index, code_len = otp.len(), "Passcode found");
                return ClassificationResult::Found {
                    otp,
                    subject: parsed.subject,
                    received_at: parsed.received_at,
                };
            }
        }

        debug!(message_count = messages.len(), "No passcode in any message");
        ClassificationResult::NoOtp {
            subject: first.subject_or_default().to_string(),
        }
    }

    fn runs<'a>(&self, text: &'a str) -> DigitRuns<'a> {
        digit_runs(text, self.lengths.clone())
    }

    fn prefixed<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.marker.is_empty() {
            return None;
        }
        self.runs(text)
            .filter(|run| text[..run.start].ends_with(self.marker.as_str()))
            .map(|run| run.value)
            .find(|code| !self.ignore.contains(code))
    }

    fn keyword_anchored<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.keywords.iter().find_map(|keyword| {
            let anchor = find_ignore_ascii_case(text, keyword)?;
            self.runs(text)
                .filter(|run| run.start > anchor)
                .map(|run| run.value)
                .find(|code| !self.ignore.contains(code))
        })
    }

    fn longest<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.runs(text)
            .map(|run| run.value)
            .filter(|code| !self.ignore.contains(code))
            .fold(None, |best: Option<&'a str>, code| match best {
                Some(b) if b.len() >= code.len() => Some(b),
                _ => Some(code),
            })
    }
}

/// Plain-text body, falling back to the entity-decoded HTML body.
fn body_text(message: &MessageRecord) -> Cow<'_, str> {
    if message.content.text.is_empty() {
        decode_entities(&message.content.html)
    } else {
        Cow::Borrowed(message.content.text.as_str())
    }
}
