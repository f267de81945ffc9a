use chrono::DateTime;
use mailparse::MailHeaderMap;
use tracing::error;

use crate::session::{HEADER_FETCH_ITEMS, MailboxSession, MessageId};
use crate::time::Instant;

pub const NO_SUBJECT: &str = "No Subject";
pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const UNKNOWN_DATE: &str = "Unknown Date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeaders {
    pub subject: String,
    pub sender: String,
    pub date_raw: String,
    pub date_parsed: Option<Instant>,
}

impl MessageHeaders {
    /// Placeholder used when the server could not be asked.
    pub fn unavailable() -> Self {
        Self {
            subject: String::new(),
            sender: String::new(),
            date_raw: String::new(),
            date_parsed: None,
        }
    }

    pub fn from_raw(raw: &[u8]) -> Self {
        let (subject, sender, date_raw) = match mailparse::parse_headers(raw) {
            Ok((headers, _)) => (
                headers.get_first_value("Subject"),
                headers.get_first_value("From"),
                headers.get_first_value("Date"),
            ),
            Err(_) => (None, None, None),
        };
        let date_raw = date_raw.unwrap_or_else(|| UNKNOWN_DATE.to_string());
        let date_parsed = parse_header_date(&date_raw);
        Self {
            subject: subject.unwrap_or_else(|| NO_SUBJECT.to_string()),
            sender: sender.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            date_raw,
            date_parsed,
        }
    }
}

/// Parses an RFC 5322 `Date` value. A trailing comment such as `(UTC)` is ignored.
///
/// Values without an explicit zone, and the "unknown zone" marker `-0000`, do not parse.
pub fn parse_header_date(raw: &str) -> Option<Instant> {
    let value = strip_trailing_comment(raw.trim());
    if value.is_empty() || value.ends_with("-0000") {
        return None;
    }
    DateTime::parse_from_rfc2822(value).ok()
}

fn strip_trailing_comment(value: &str) -> &str {
    match value
        .strip_suffix(')')
        .and_then(|open| open.rfind('('))
    {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

/// Never fails: a fetch error is logged and yields empty values.
pub fn fetch_headers<S: MailboxSession + ?Sized>(session: &mut S, id: MessageId) -> MessageHeaders {
    match session.fetch_header_fields(id, HEADER_FETCH_ITEMS) {
        Ok(raw) => MessageHeaders::from_raw(&raw),
        Err(err) => {
            error!("Error getting message info for {}: {}", id, err);
            MessageHeaders::unavailable()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{MessageHeaders, fetch_headers, parse_header_date};
    use crate::mock::{MockMessage, MockServer};
    use crate::session::{MailboxSession, MessageId};

    #[test]
    fn headers_are_extracted_case_insensitively() {
        let raw = b"subject: Quarterly report\r\nFROM: Alice <alice@example.com>\r\nDate: 10 Jun 2023 09:30:00 +0200\r\n\r\n";
        let headers = MessageHeaders::from_raw(raw);
        assert_eq!(headers.subject, "Quarterly report");
        assert_eq!(headers.sender, "Alice <alice@example.com>");
        assert_eq!(headers.date_raw, "10 Jun 2023 09:30:00 +0200");
        assert_eq!(
            headers.date_parsed.unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 10, 7, 30, 0).unwrap()
        );
    }

    #[test]
    fn missing_headers_fall_back_to_sentinels() {
        let headers = MessageHeaders::from_raw(b"X-Other: 1\r\n\r\n");
        assert_eq!(headers.subject, "No Subject");
        assert_eq!(headers.sender, "Unknown Sender");
        assert_eq!(headers.date_raw, "Unknown Date");
        assert!(headers.date_parsed.is_none());
    }

    #[test]
    fn encoded_subjects_are_decoded() {
        let raw = b"Subject: =?UTF-8?B?SGVsbG8gV29ybGQ=?=\r\n\r\n";
        assert_eq!(MessageHeaders::from_raw(raw).subject, "Hello World");
    }

    #[test]
    fn header_dates_respect_their_zone() {
        let east = parse_header_date("Sat, 10 Jun 2023 12:00:00 +0300").unwrap();
        let west = parse_header_date("10 Jun 2023 04:00:00 -0500").unwrap();
        assert_eq!(east, Utc.with_ymd_and_hms(2023, 6, 10, 9, 0, 0).unwrap());
        assert_eq!(west, Utc.with_ymd_and_hms(2023, 6, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn obsolete_zone_names_are_accepted() {
        let parsed = parse_header_date("10 Jun 2023 09:00:00 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 6, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn garbage_dates_do_not_parse() {
        for raw in ["tomorrow", "", "Unknown Date", "Jun 2023", "2023-06-10"] {
            assert!(parse_header_date(raw).is_none(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn dates_without_a_known_zone_do_not_parse() {
        assert!(parse_header_date("10 Jun 2023 09:00:00").is_none());
        assert!(parse_header_date("Sat, 10 Jun 2023 09:00:00 -0000").is_none());
    }

    #[test]
    fn trailing_zone_comment_is_ignored() {
        let parsed = parse_header_date("Sat, 10 Jun 2023 09:00:00 +0000 (UTC)").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 6, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn fetch_failure_yields_empty_values() {
        let server = MockServer::new();
        server.add_message("INBOX", MockMessage::dated(7, "10 Jun 2023 09:00:00 +0000"));
        server.fail_fetch(7);
        let mut session = server.connect();
        session.select("INBOX").unwrap();
        let headers = fetch_headers(&mut session, MessageId(7));
        assert_eq!(headers, MessageHeaders::unavailable());
    }

    #[test]
    fn fetch_uses_peek_and_leaves_seen_alone() {
        let server = MockServer::new();
        server.add_message("INBOX", MockMessage::dated(3, "10 Jun 2023 09:00:00 +0000"));
        let mut session = server.connect();
        session.select("INBOX").unwrap();
        let headers = fetch_headers(&mut session, MessageId(3));
        assert_eq!(headers.date_raw, "10 Jun 2023 09:00:00 +0000");
        assert!(!server.message("INBOX", 3).unwrap().seen);
        assert!(server.trace().iter().any(|c| c.contains("BODY.PEEK[HEADER.FIELDS")));
    }
}
