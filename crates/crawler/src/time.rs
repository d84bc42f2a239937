//! Listing timestamp helpers.
//!
//! Listings carry either an ISO-8601 `datetime` attribute or relative text
//! such as "3 hours ago". Both resolve to a UTC instant; age is measured in
//! fractional days against a caller-supplied `now` so results are repeatable.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(minute|hour|day|week|month)s?\s*ago")
        .expect("relative time pattern is a valid regex")
});

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parse an ISO-8601 timestamp into UTC.
///
/// A trailing `Z`, an explicit offset, or no offset at all (read as UTC) are
/// all accepted, as is a bare date.
pub fn parse_iso_datetime(text: &str) -> Option<DateTime<Utc>> {
    let clean = text.trim();
    if clean.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(clean) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(clean, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(clean, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve "N unit(s) ago" relative to `now`. A month counts as 30 days.
pub fn parse_relative_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_TIME.captures(text)?;
    let qty: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();

    let delta = match unit.as_str() {
        "minute" => Duration::try_minutes(qty)?,
        "hour" => Duration::try_hours(qty)?,
        "day" => Duration::try_days(qty)?,
        "week" => Duration::try_weeks(qty)?,
        "month" => Duration::try_days(qty.checked_mul(30)?)?,
        _ => return None,
    };
    now.checked_sub_signed(delta)
}

/// Age in fractional days, clamped at zero for timestamps in the future.
pub fn age_days_from(listed: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - listed).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn iso_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap();
        assert_eq!(parse_iso_datetime("2025-03-08T12:00:00Z"), Some(expected));
        assert_eq!(parse_iso_datetime("2025-03-08T13:00:00+01:00"), Some(expected));
        assert_eq!(parse_iso_datetime(" 2025-03-08T12:00:00 "), Some(expected));
        assert_eq!(parse_iso_datetime("2025-03-08T12:00:00.000Z"), Some(expected));
        assert!(parse_iso_datetime("2025-03-08").is_some());
        assert_eq!(parse_iso_datetime("yesterday"), None);
        assert_eq!(parse_iso_datetime(""), None);
    }

    #[test]
    fn relative_units() {
        let now = now();
        assert_eq!(
            parse_relative_time("Listed 3 hours ago", now),
            Some(now - Duration::hours(3))
        );
        assert_eq!(
            parse_relative_time("1 minute ago", now),
            Some(now - Duration::minutes(1))
        );
        assert_eq!(
            parse_relative_time("2 Weeks ago", now),
            Some(now - Duration::weeks(2))
        );
        assert_eq!(
            parse_relative_time("2 months ago", now),
            Some(now - Duration::days(60))
        );
        assert_eq!(parse_relative_time("a while back", now), None);
    }

    #[test]
    fn age_is_fractional_and_clamped() {
        let now = now();
        assert!((age_days_from(now - Duration::hours(36), now) - 1.5).abs() < 1e-9);
        assert_eq!(age_days_from(now + Duration::hours(1), now), 0.0);
    }
}
