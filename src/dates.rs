//! Resolution of Google Maps relative dates ("3 months ago") to calendar dates.
//!
//! Month and year are fixed 30 and 365 day spans. Imports that already
//! happened were resolved with these multipliers, so they stay approximate.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

fn relative_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\s+(year|month|day|week)s?").expect("relative date pattern is valid")
    })
}

fn article_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\ban?\s").expect("article pattern is valid"))
}

/// Resolve a relative date against the current local time.
///
/// Returns `YYYY-MM-DD`, or the input unchanged when it is not a relative
/// date. Already-resolved dates pass through, so resolving twice is safe.
pub fn resolve_relative_date(input: &str) -> String {
    resolve_relative_date_at(input, Local::now().naive_local())
}

/// Same as [`resolve_relative_date`] with an explicit anchor.
pub fn resolve_relative_date_at(input: &str, now: NaiveDateTime) -> String {
    let normalized = article_regex().replace_all(&input.to_lowercase(), "1 ").into_owned();

    let Some(caps) = relative_date_regex().captures(&normalized) else {
        return input.to_string();
    };

    let Ok(quantity) = caps[1].parse::<i64>() else {
        return input.to_string();
    };

    let days_per_unit = match &caps[2] {
        "day" => 1,
        "week" => 7,
        "month" => 30,
        "year" => 365,
        _ => return input.to_string(),
    };

    quantity
        .checked_mul(days_per_unit)
        .and_then(Duration::try_days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .filter(|resolved| (1..=9999).contains(&resolved.year()))
        .map(|resolved| resolved.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| input.to_string())
}

/// Parse a resolved review date.
///
/// Relative strings are resolved first. Accepts `YYYY-MM-DD` optionally
/// followed by a time component (`2024-05-01 00:00:00`, `2024-05-01T00:00:00`).
pub fn parse_review_date(input: &str) -> Option<NaiveDate> {
    let resolved = resolve_relative_date(input.trim());
    let date_part = resolved.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_units_and_articles() {
        let now = anchor();
        assert_eq!(resolve_relative_date_at("3 days ago", now), "2025-06-27");
        assert_eq!(resolve_relative_date_at("2 weeks ago", now), "2025-06-16");
        assert_eq!(resolve_relative_date_at("a month ago", now), "2025-05-31");
        assert_eq!(resolve_relative_date_at("3 months ago", now), "2025-04-01");
        assert_eq!(resolve_relative_date_at("a year ago", now), "2024-06-30");
        assert_eq!(resolve_relative_date_at("2 years ago", now), "2023-07-01");
        assert_eq!(resolve_relative_date_at("A week ago", now), "2025-06-23");
        assert_eq!(resolve_relative_date_at("an day ago", now), "2025-06-29");
        assert_eq!(resolve_relative_date_at("Edited 2 months ago", now), "2025-05-01");
    }

    #[test]
    fn test_singular_and_plural_units_match() {
        let now = anchor();
        assert_eq!(
            resolve_relative_date_at("1 month ago", now),
            resolve_relative_date_at("1 months ago", now)
        );
    }

    #[test]
    fn test_unrecognized_input_passes_through() {
        let now = anchor();
        assert_eq!(resolve_relative_date_at("yesterday", now), "yesterday");
        assert_eq!(resolve_relative_date_at("", now), "");
        assert_eq!(resolve_relative_date_at("5 hours ago", now), "5 hours ago");
    }

    #[test]
    fn test_absolute_date_is_idempotent() {
        let now = anchor();
        let once = resolve_relative_date_at("4 months ago", now);
        assert_eq!(resolve_relative_date_at(&once, now), once);
        assert_eq!(resolve_relative_date_at("2024-01-15", now), "2024-01-15");
    }

    #[test]
    fn test_overflow_falls_back_to_input() {
        let huge = "99999999999999999 years ago";
        assert_eq!(resolve_relative_date_at(huge, anchor()), huge);
        let too_big = "999999999999999999999 days ago";
        assert_eq!(resolve_relative_date_at(too_big, anchor()), too_big);
    }

    #[test]
    fn test_dates_before_year_one_fall_back_to_input() {
        let now = anchor();
        assert_eq!(resolve_relative_date_at("2100 years ago", now), "2100 years ago");
        assert_eq!(resolve_relative_date_at("3000 years ago", now), "3000 years ago");
        assert_eq!(resolve_relative_date_at("2000 years ago", now), "0026-10-28");
        assert_eq!(parse_review_date("2100 years ago"), None);
    }

    #[test]
    fn test_parse_review_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(parse_review_date("2024-05-01"), expected);
        assert_eq!(parse_review_date("2024-05-01 00:00:00"), expected);
        assert_eq!(parse_review_date(" 2024-05-01T08:30:00 "), expected);
        assert_eq!(parse_review_date("not a date"), None);
        assert_eq!(parse_review_date(""), None);
        assert!(parse_review_date("2 weeks ago").is_some());
    }
}
