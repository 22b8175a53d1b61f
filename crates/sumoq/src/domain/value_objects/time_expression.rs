//! Time expressions for search job bounds
//!
//! Resolves the user-facing forms (`now`, epoch millis, ISO-8601, `-15m`)
//! into the epoch-millisecond strings the search API expects.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Resolve a time expression against the current wall clock.
pub fn resolve_time(input: &str) -> String {
    resolve_time_at(input, Utc::now())
}

/// Resolve a time expression against `now`.
///
/// Shapes that match nothing are returned unchanged; the search API
/// rejects them on submit.
pub fn resolve_time_at(input: &str, now: DateTime<Utc>) -> String {
    if input == "now" {
        return now.timestamp_millis().to_string();
    }

    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return input.to_string();
    }

    if looks_like_timestamp(input) {
        if let Some(parsed) = parse_timestamp(input) {
            return parsed.timestamp_millis().to_string();
        }
    }

    // Offsets past the representable range fall through unchanged
    if let Some(resolved) =
        parse_relative(input).and_then(|offset| now.checked_sub_signed(offset))
    {
        return resolved.timestamp_millis().to_string();
    }

    input.to_string()
}

fn looks_like_timestamp(s: &str) -> bool {
    s.contains('T') || (s.contains('-') && s.contains(':'))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `-<n><unit>` with unit in s, m, h, d, w
fn parse_relative(s: &str) -> Option<Duration> {
    let body = s.strip_prefix('-')?;
    let unit = body.chars().last()?;
    let amount = &body[..body.len() - unit.len_utf8()];

    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: i64 = amount.parse().ok()?;

    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => None,
    }
}
