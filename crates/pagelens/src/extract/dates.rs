// ABOUTME: Date string normalisation for extracted publish and modify dates.
// ABOUTME: Accepts RFC3339, loose English, slash/dot numeric and Japanese YYYY年M月D日 forms.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static JAPANESE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日").unwrap());

// Date-only forms are read as UTC midnight so the calendar day never shifts.
const DATE_ONLY_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%b %e, %Y",
    "%e %b %Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%B %e, %Y",
    "%e %B %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Parse a date string found on a page.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Some(date) = japanese_date(s) {
        return midnight(date);
    }
    for pattern in DATE_ONLY_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(s, pattern) {
            return midnight(date);
        }
    }
    dateparser::parse(s).ok().map(|dt| dt.fixed_offset())
}

/// RFC3339 form of `raw` when it parses, otherwise the trimmed input.
pub fn normalize_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(dt) => dt.to_rfc3339(),
        None => raw.trim().to_string(),
    }
}

fn japanese_date(s: &str) -> Option<NaiveDate> {
    let caps = JAPANESE_DATE_RE.captures(s)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn midnight(date: NaiveDate) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_keeps_offset() {
        assert_eq!(
            normalize_date("2024-03-01T09:30:00+09:00"),
            "2024-03-01T09:30:00+09:00"
        );
    }

    #[test]
    fn japanese_dates() {
        assert_eq!(normalize_date("2024年3月1日"), "2024-03-01T00:00:00+00:00");
        assert_eq!(
            normalize_date("投稿日: 2023年 12月 25日"),
            "2023-12-25T00:00:00+00:00"
        );
        assert!(parse_date("2024年2月30日").is_none());
    }

    #[test]
    fn numeric_and_english_dates() {
        for raw in ["2024/03/01", "2024.03.01", "2024-03-01", "Mar 1, 2024", "1 March 2024"] {
            assert_eq!(normalize_date(raw), "2024-03-01T00:00:00+00:00", "{raw}");
        }
    }

    #[test]
    fn unparseable_is_kept_trimmed() {
        assert_eq!(normalize_date("  sometime last spring  "), "sometime last spring");
        assert!(parse_date("").is_none());
    }
}
