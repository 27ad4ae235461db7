//! Formatting helpers for dates, times, durations and HTML text.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

/// Formats a date as the compact `YYYYMMDD` token used in logs and archive names.
#[must_use]
pub fn date_token(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Formats a time as `HHMMSS` (no separators, no fraction).
#[must_use]
pub fn time_token(time: NaiveTime) -> String {
    time.format("%H%M%S").to_string()
}

/// Extracts the `HH:MM` time of day embedded in an archive file name.
///
/// Archive names look like `YYYYMMDD_HHMMSS_name`; returns `None` when the
/// name is too short or the digits are missing.
#[must_use]
pub fn archive_clock(archive_name: &str) -> Option<String> {
    let hhmm = archive_name.get(9..13)?;
    if archive_name.as_bytes().get(8) != Some(&b'_') || !hhmm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}:{}", &hhmm[..2], &hhmm[2..]))
}

/// Formats a duration as a human-readable string (e.g. "5.0s", "1m 05s", "1h 01m 05s").
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!(
            "{}h {:02}m {:02}s",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:01}s", secs, d.subsec_millis() / 100)
    }
}

/// Escapes text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_and_time_tokens() {
        let date = NaiveDate::from_ymd_opt(2021, 8, 31).unwrap();
        let time = NaiveTime::from_hms_micro_opt(9, 5, 3, 999_999).unwrap();
        assert_eq!(date_token(date), "20210831");
        assert_eq!(time_token(time), "090503");
    }

    #[test]
    fn archive_clock_from_name() {
        assert_eq!(archive_clock("20210831_140107_file.txt").as_deref(), Some("14:01"));
        assert_eq!(archive_clock("20210831_1401"), Some("14:01".to_string()));
        assert_eq!(archive_clock("short"), None);
        assert_eq!(archive_clock("20210831-140107_file.txt"), None);
        assert_eq!(archive_clock("20210831_ab0107_file.txt"), None);
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 01m 05s");
    }

    #[test]
    fn format_duration_subsecond() {
        assert_eq!(format_duration(Duration::from_millis(500)), "0.5s");
    }

    #[test]
    fn escape_html_specials() {
        assert_eq!(escape_html("a<b> & \"c\" 'd'"), "a&lt;b&gt; &amp; &quot;c&quot; &#39;d&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_duration_never_panics(secs in 0u64..1_000_000) {
                let _ = format_duration(Duration::from_secs(secs));
            }

            #[test]
            fn escaped_html_has_no_raw_brackets(text in ".*") {
                let escaped = escape_html(&text);
                prop_assert!(!escaped.contains('<'));
                prop_assert!(!escaped.contains('>'));
            }

            #[test]
            fn archive_clock_never_panics(name in ".{0,24}") {
                let _ = archive_clock(&name);
            }
        }
    }
}
