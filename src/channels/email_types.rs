//! Email parsing helpers — RFC 822 to `RawEmail`, body extraction, IMAP
//! response parsing.
//!
//! Pure functions only; the network side lives in `email.rs`.

use mail_parser::{MessageParser, MimeHeaders};

use crate::pipeline::types::RawEmail;

/// Bodies longer than this (in chars) are truncated.
pub const MAX_BODY_CHARS: usize = 5000;

/// Parse a raw RFC 822 message into a `RawEmail`.
///
/// Returns `None` when the bytes are not a message at all.
pub fn parse_email(id: &str, raw: &[u8]) -> Option<RawEmail> {
    let parsed = MessageParser::default().parse(raw)?;

    Some(RawEmail {
        id: Some(id.to_string()),
        subject: parsed.subject().unwrap_or("(no subject)").to_string(),
        sender: format_sender(&parsed),
        body: cap_chars(&extract_body(&parsed), MAX_BODY_CHARS),
        date: parsed.date().map(|d| d.to_rfc822()),
    })
}

/// `Name <address>` when a display name is present, else the bare address.
pub fn format_sender(parsed: &mail_parser::Message) -> String {
    let Some(addr) = parsed.from().and_then(|a| a.first()) else {
        return "unknown".into();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => "unknown".into(),
    }
}

/// First `text/plain` body; HTML is stripped as a fallback.
pub fn extract_body(parsed: &mail_parser::Message) -> String {
    for part in parsed.text_bodies() {
        let is_plain = MimeHeaders::content_type(part)
            .is_none_or(|ct| ct.ctype() == "text" && ct.subtype().is_none_or(|s| s == "plain"));
        if is_plain && let Some(text) = part.text_contents() {
            return text.to_string();
        }
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` chars, on a char boundary.
pub fn cap_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

// ── IMAP response parsing ───────────────────────────────────────────

/// Message sequence numbers from the untagged `* SEARCH` lines, in
/// server order (oldest first).
pub fn parse_search_ids(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| line.strip_prefix("* SEARCH"))
        .flat_map(|rest| rest.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// The last `limit` ids, newest first.
pub fn newest_first(mut ids: Vec<String>, limit: usize) -> Vec<String> {
    let skip = ids.len().saturating_sub(limit);
    ids.drain(..skip);
    ids.reverse();
    ids
}

/// Size of the literal announced at the end of a response line (`{123}`).
pub fn literal_size(line: &str) -> Option<usize> {
    let line = line.trim_end();
    let inner = line.strip_suffix('}')?;
    let open = inner.rfind('{')?;
    inner[open + 1..].parse().ok()
}
