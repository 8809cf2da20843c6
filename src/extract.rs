//! Extraction — turns a raw message body into a typed `ExtractedName`.
//!
//! This is the boundary between text-format fragility and the matching
//! core. Court notification emails carry a `Noncitizen Name: SURNAME, First`
//! line, usually inside HTML; we strip markup, pull the name and the
//! optional A-number, and normalize the platform's three timestamp formats
//! into one `DateTime<Utc>`. A body with no parseable surname is an
//! extraction miss, not an error: the message is simply dropped from the
//! cycle.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::pipeline::types::{ExtractedName, RawMessage};

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Noncitizen Name:\s*([^,\n]+),\s*([^\n]+)").unwrap())
}

fn a_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{3}-\d{3}-\d{3}|\d{9})\b").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<[^>]+>").unwrap()
    })
}

/// Strip HTML markup from a message body, leaving whitespace-separated text.
///
/// Intentionally rough: notification emails are machine-generated tables,
/// not arbitrary documents. Script/style contents are removed wholesale,
/// every other tag becomes a space, common entities are decoded.
pub fn strip_html(body: &str) -> String {
    let text = tag_re().replace_all(body, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    // Collapse runs of spaces/tabs but keep line structure for the
    // line-anchored name regex.
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            out.push_str(&collapsed);
            out.push('\n');
        }
    }
    out
}

/// Names longer than this many tokens are trailing junk, not names.
const MAX_FIRST_NAME_TOKENS: usize = 4;

/// Trim trailing junk off a first-name capture.
///
/// When markup collapses a notification onto a single line, the capture
/// runs to end-of-line and picks up whatever follows the name
/// ("Ahmet A-Number: 123-456-789"). Cut at the first label-like (`Foo:`)
/// or digit-bearing token and cap the token count.
fn clean_first_name(raw: &str) -> Option<String> {
    let mut tokens: Vec<&str> = Vec::new();
    for token in raw.split_whitespace() {
        if token.ends_with(':') || token.chars().any(|c| c.is_ascii_digit()) {
            break;
        }
        tokens.push(token);
        if tokens.len() == MAX_FIRST_NAME_TOKENS {
            break;
        }
    }
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Normalize a platform timestamp value to `DateTime<Utc>`.
///
/// Accepts epoch seconds, epoch milliseconds (detected by magnitude), and
/// ISO-8601 strings. Anything else is `None`.
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            let raw = n.as_f64()?;
            let secs = if raw > 1e12 { raw / 1000.0 } else { raw };
            DateTime::from_timestamp(secs as i64, 0)
        }
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Extract a name event from one raw message.
///
/// Returns `None` when the body has no parseable surname or the timestamp
/// cannot be normalized — both drop the message from this cycle.
pub fn extract_event(message: &RawMessage) -> Option<ExtractedName> {
    let text = strip_html(&message.body);

    let captures = name_re().captures(&text)?;
    let last_name = captures.get(1)?.as_str().trim().to_string();
    if last_name.is_empty() {
        return None;
    }
    let first_name = captures.get(2).and_then(|m| clean_first_name(m.as_str()));

    let Some(observed_at) = parse_timestamp(&message.created_at) else {
        debug!(
            message_id = %message.id,
            raw = %message.created_at,
            "Dropping message with unparseable timestamp"
        );
        return None;
    };

    let a_number = a_number_re()
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace('-', ""));

    Some(ExtractedName {
        first_name,
        last_name,
        message_id: message.id.clone(),
        conversation_id: message.conversation_id.clone(),
        observed_at,
        a_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str, created_at: serde_json::Value) -> RawMessage {
        RawMessage {
            id: "m1".into(),
            conversation_id: "c1".into(),
            body: body.into(),
            created_at,
        }
    }

    #[test]
    fn extracts_name_from_plain_text() {
        let msg = message(
            "Noncitizen Name: YILMAZ, Ahmet\nUploaded On: 01/02/2025",
            serde_json::json!(1735_776_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.last_name, "YILMAZ");
        assert_eq!(event.first_name.as_deref(), Some("Ahmet"));
    }

    #[test]
    fn extracts_name_from_html_body() {
        let msg = message(
            "<html><body><table><tr><td>Noncitizen Name:</td>\
             <td>YILMAZ, Ahmet Can</td></tr></table></body></html>",
            serde_json::json!(1735_776_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.last_name, "YILMAZ");
        assert_eq!(event.first_name.as_deref(), Some("Ahmet Can"));
    }

    #[test]
    fn first_name_stops_at_a_following_label() {
        // No newline between the name and the next field: the capture runs
        // on, the cleaner cuts it back.
        let msg = message(
            "Noncitizen Name: YILMAZ, Ahmet A-Number: 123-456-789",
            serde_json::json!(1_700_000_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.first_name.as_deref(), Some("Ahmet"));
        assert_eq!(event.a_number.as_deref(), Some("123456789"));
    }

    #[test]
    fn collapsed_html_line_yields_clean_first_name() {
        let msg = message(
            "<tr><td>Noncitizen Name: YILMAZ, Ahmet Can</td><td>Date: 01/02/2025</td></tr>",
            serde_json::json!(1_700_000_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.first_name.as_deref(), Some("Ahmet Can"));
    }

    #[test]
    fn first_name_stops_at_a_digit_token() {
        let msg = message(
            "Noncitizen Name: YILMAZ, Ahmet 01/02/2025",
            serde_json::json!(1_700_000_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.first_name.as_deref(), Some("Ahmet"));
    }

    #[test]
    fn all_junk_first_name_is_dropped_not_kept() {
        // Surname parsed, first-name capture is pure trailing junk; the
        // event survives with no first name and can still resolve via the
        // surname tier.
        let msg = message(
            "Noncitizen Name: YILMAZ, 123456789",
            serde_json::json!(1_700_000_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.first_name, None);
        assert_eq!(event.a_number.as_deref(), Some("123456789"));
    }

    #[test]
    fn body_without_name_is_a_miss() {
        let msg = message("Your hearing was rescheduled.", serde_json::json!(0));
        assert!(extract_event(&msg).is_none());
    }

    #[test]
    fn unparseable_timestamp_drops_message() {
        let msg = message(
            "Noncitizen Name: YILMAZ, Ahmet",
            serde_json::Value::String("yesterday".into()),
        );
        assert!(extract_event(&msg).is_none());
    }

    #[test]
    fn finds_hyphenated_a_number() {
        let msg = message(
            "Noncitizen Name: YILMAZ, Ahmet\nA-Number: 123-456-789",
            serde_json::json!(1735_776_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.a_number.as_deref(), Some("123456789"));
    }

    #[test]
    fn finds_bare_nine_digit_a_number() {
        let msg = message(
            "Noncitizen Name: YILMAZ, Ahmet\nRef 987654321",
            serde_json::json!(1735_776_000),
        );
        let event = extract_event(&msg).unwrap();
        assert_eq!(event.a_number.as_deref(), Some("987654321"));
    }

    #[test]
    fn parses_epoch_seconds() {
        let ts = parse_timestamp(&serde_json::json!(1_700_000_000)).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_epoch_milliseconds() {
        let ts = parse_timestamp(&serde_json::json!(1_700_000_000_000u64)).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_iso_8601_string() {
        let ts = parse_timestamp(&serde_json::json!("2025-01-02T03:04:05Z")).unwrap();
        assert_eq!(ts.timestamp(), 1735787045);
    }

    #[test]
    fn rejects_null_and_garbage_timestamps() {
        assert!(parse_timestamp(&serde_json::Value::Null).is_none());
        assert!(parse_timestamp(&serde_json::json!("not a date")).is_none());
        assert!(parse_timestamp(&serde_json::json!({"t": 1})).is_none());
    }

    #[test]
    fn strip_html_removes_style_blocks() {
        let text = strip_html("<style>td { color: red; }</style><p>Noncitizen Name: KAYA, Fatma</p>");
        assert!(!text.contains("color"));
        assert!(text.contains("Noncitizen Name: KAYA, Fatma"));
    }

    #[test]
    fn strip_html_decodes_entities() {
        let text = strip_html("Smith &amp; Jones&nbsp;LLP");
        assert_eq!(text.trim(), "Smith & Jones LLP");
    }
}
