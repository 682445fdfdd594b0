//! Display formatting for file listings and downloads.
//!
//! These are presentation conveniences layered on top of the stored
//! records; nothing here is persisted.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Matches the `_<millis>` segment injected into stored names, capturing
/// the extension that follows it.
static STORED_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\d+(\.[^.]+)$").expect("stored-name suffix pattern"));

/// Format a byte count as a short human-readable string (`1.5 KB`).
pub fn human_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 Bytes".into();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exponent = ((bytes.ilog2() / 10) as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[exponent])
}

/// Format estimated playback seconds as `m:ss`.
pub fn clock_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "N/A".into();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Format a count with thousands separators (`10,000`).
pub fn grouped_count(count: i64) -> String {
    let digits = count.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if count < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format an upload instant for listings, e.g. `Jan 5, 2026, 03:04 PM`.
pub fn display_date(instant: &DateTime<Utc>) -> String {
    instant.format("%b %-d, %Y, %I:%M %p").to_string()
}

/// Reconstruct the original display name from a stored name by stripping
/// the injected timestamp segment (`notes_1712345678901.txt` → `notes.txt`).
pub fn display_name(stored_name: &str) -> String {
    STORED_SUFFIX_RE.replace(stored_name, "$1").into_owned()
}

/// Build a Content-Disposition value that forces a download under the
/// given display name. Control characters are stripped and quotes escaped
/// so a hostile filename cannot inject headers; non-ASCII names get an
/// RFC 5987 `filename*` parameter.
pub fn content_disposition(filename: &str) -> String {
    if filename.is_ascii()
        && !filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\')
    {
        return format!("attachment; filename=\"{filename}\"");
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();
    let encoded = percent_encode(filename);

    format!("attachment; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sizes_render_like_the_listing_expects() {
        assert_eq!(human_size(0), "0 Bytes");
        assert_eq!(human_size(11), "11 Bytes");
        assert_eq!(human_size(1024), "1 KB");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(1_280_000), "1.22 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn durations_render_minutes_and_padded_seconds() {
        assert_eq!(clock_duration(80), "1:20");
        assert_eq!(clock_duration(59), "0:59");
        assert_eq!(clock_duration(600), "10:00");
        assert_eq!(clock_duration(0), "N/A");
    }

    #[test]
    fn counts_group_thousands() {
        assert_eq!(grouped_count(0), "0");
        assert_eq!(grouped_count(999), "999");
        assert_eq!(grouped_count(10_000), "10,000");
        assert_eq!(grouped_count(1_234_567), "1,234,567");
    }

    #[test]
    fn dates_render_short_month_form() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 5, 15, 4, 0).unwrap();
        assert_eq!(display_date(&instant), "Jan 5, 2026, 03:04 PM");
    }

    #[test]
    fn display_name_strips_injected_timestamp() {
        assert_eq!(display_name("notes_1712345678901.txt"), "notes.txt");
        assert_eq!(display_name("a_b_17123.tar"), "a_b.tar");
        // No timestamp segment: returned unchanged.
        assert_eq!(display_name("plain.txt"), "plain.txt");
        assert_eq!(display_name("noext_171234"), "noext_171234");
    }

    #[test]
    fn disposition_for_plain_ascii() {
        assert_eq!(
            content_disposition("notes.txt"),
            "attachment; filename=\"notes.txt\""
        );
    }

    #[test]
    fn disposition_escapes_header_injection() {
        let value = content_disposition("evil\r\nX-Bad: 1.txt");
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(value.starts_with("attachment; filename="));
    }

    #[test]
    fn disposition_encodes_unicode_names() {
        let value = content_disposition("résumé.pdf");
        assert!(value.contains("filename*=UTF-8''"));
        assert!(value.contains("%C3%A9"));
    }
}
