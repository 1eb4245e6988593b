//! Internal module for turning raw RFC 822 messages into [`MessageRecord`]s.

use crate::message::{MessageContent, MessageRecord};
use crate::session::RawMessage;
use chrono::{DateTime, TimeZone, Utc};
use mailparse::{parse_mail, DispositionType, MailHeaderMap, ParsedMail};
use tracing::{debug, warn};

/// Converts a fetched message into a record.
///
/// Malformed messages are logged and skipped rather than failing the whole
/// fetch.
pub(crate) fn record_from_raw(raw: &RawMessage) -> Option<MessageRecord> {
    match parse_record(&raw.body) {
        Ok(mut record) => {
            if record.received_at.is_none() {
                record.received_at = raw.internal_date.map(|d| d.with_timezone(&Utc));
            }
            debug!(
                uid = raw.uid,
                has_text = !record.content.text.is_empty(),
                has_html = !record.content.html.is_empty(),
                "Parsed message"
            );
            Some(record)
        }
        Err(e) => {
            warn!(uid = raw.uid, error = %e, "Failed to parse email, skipping message");
            None
        }
    }
}

/// Parses raw message bytes.
///
/// The receive time comes from the `Date` header when it parses.
pub(crate) fn parse_record(raw: &[u8]) -> Result<MessageRecord, mailparse::MailParseError> {
    let parsed = parse_mail(raw)?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let received_at = parsed
        .headers
        .get_first_value("Date")
        .and_then(|d| parse_date(&d));

    let mut content = MessageContent::default();
    collect_bodies(&parsed, &mut content)?;

    Ok(MessageRecord {
        subject,
        content,
        received_at,
    })
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let timestamp = mailparse::dateparse(value).ok()?;
    Utc.timestamp_opt(timestamp, 0).single()
}

/// Walks the MIME tree depth-first, keeping the first inline `text/plain`
/// and `text/html` parts.
fn collect_bodies(
    part: &ParsedMail<'_>,
    content: &mut MessageContent,
) -> Result<(), mailparse::MailParseError> {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_bodies(sub, content)?;
            if !content.text.is_empty() && !content.html.is_empty() {
                break;
            }
        }
        return Ok(());
    }

    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return Ok(());
    }

    let slot = match part.ctype.mimetype.to_ascii_lowercase().as_str() {
        "text/plain" => &mut content.text,
        "text/html" => &mut content.html,
        _ => return Ok(()),
    };

    if slot.is_empty() {
        *slot = part.get_body()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, FixedOffset, Timelike};

    const MULTIPART: &[u8] = b"From: Facebook <security@facebookmail.com>\r\n\
Subject: FB-12345678 is your confirmation code\r\n\
Date: Tue, 14 Oct 2025 09:30:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Your confirmation code is 12345678.\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Your code is <b>12345678</b></p>\r\n\
--b1--\r\n";

    #[test]
    fn test_multipart_keeps_both_bodies() {
        let record = parse_record(MULTIPART).unwrap();
        assert_eq!(record.subject, "FB-12345678 is your confirmation code");
        assert!(record.content.text.contains("12345678"));
        assert!(record.content.html.contains("<b>12345678</b>"));

        let at = record.received_at.unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2025, 10, 14));
        assert_eq!((at.hour(), at.minute()), (9, 30));
    }

    #[test]
    fn test_html_only_message() {
        let raw = b"Subject: Login\r\nContent-Type: text/html\r\n\r\n<div>Code&#58; 482913</div>";
        let record = parse_record(raw).unwrap();
        assert!(record.content.text.is_empty());
        assert!(record.content.html.contains("482913"));
    }

    #[test]
    fn test_missing_subject_and_date() {
        let raw = b"From: test@example.com\r\n\r\nYour code is 123456.";
        let record = parse_record(raw).unwrap();
        assert_eq!(record.subject, "");
        assert_eq!(record.subject_or_default(), "(no subject)");
        assert!(record.received_at.is_none());
        assert!(record.content.text.contains("123456"));
    }

    #[test]
    fn test_attachments_skipped() {
        let raw = b"Subject: Report\r\n\
Content-Type: multipart/mixed; boundary=\"x\"\r\n\
\r\n\
--x\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=\"codes.txt\"\r\n\
\r\n\
99999999\r\n\
--x\r\n\
Content-Type: text/plain\r\n\
\r\n\
see attached\r\n\
--x--\r\n";
        let record = parse_record(raw).unwrap();
        assert!(record.content.text.starts_with("see attached"));
    }

    #[test]
    fn test_unparseable_message_is_skipped() {
        let raw = RawMessage {
            uid: 9,
            body: b" Subject: folded too early\r\n\r\nFB-12345678".to_vec(),
            internal_date: None,
        };
        assert!(parse_record(&raw.body).is_err());
        assert!(record_from_raw(&raw).is_none());
    }

    #[test]
    fn test_internal_date_fallback() {
        let raw = RawMessage {
            uid: 7,
            body: b"Subject: hi\r\n\r\nno code here".to_vec(),
            internal_date: FixedOffset::east_opt(3600)
                .and_then(|tz| tz.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).single()),
        };
        let record = record_from_raw(&raw).unwrap();
        assert_eq!(record.received_at.unwrap().hour(), 9);
    }

    #[test]
    fn test_date_header_wins_over_internal_date() {
        let raw = RawMessage {
            uid: 8,
            body: MULTIPART.to_vec(),
            internal_date: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().fixed_offset()),
        };
        let record = record_from_raw(&raw).unwrap();
        assert_eq!(record.received_at.unwrap().year(), 2025);
    }
}
