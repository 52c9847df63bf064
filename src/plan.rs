//! Bucket planning and input validation
//!
//! Computes the fixed 10-minute bucket grid covering a requested lookback
//! window, plus the padded query window the record source must cover, and
//! validates user-supplied date/time/span input.
//!
//! # Window math
//!
//! For a reference instant `window_end` and a lookback of `span_hours`:
//!
//! - query window: `(window_end − span_hours − 10min, window_end]` — the
//!   extra 10 minutes guarantee the first bucket has a full source window
//! - bucket boundaries: `(window_end − span_hours) + i · 10min` for
//!   `i in 0..=floor(span_hours · 60 / 10)`
//!
//! A one-hour span therefore yields seven buckets, the last of which ends
//! exactly at `window_end`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{Result, ValidationError};
use crate::types::{Bucket, TimeWindow, BUCKET_MINUTES};

/// Convert a fractional hour span to a `Duration`
fn span_duration(span_hours: f64) -> Duration {
    Duration::milliseconds((span_hours * 3_600_000.0).round() as i64)
}

/// Compute the padded query window for a requested lookback
///
/// The window is half-open `(start, end]`; the source must deliver every
/// record with `start < timestamp <= end`.
pub fn query_window(window_end: DateTime<Utc>, span_hours: f64) -> TimeWindow {
    let start = window_end - span_duration(span_hours) - Duration::minutes(BUCKET_MINUTES);
    TimeWindow::new(start, window_end)
}

/// Compute the ordered bucket sequence covering the lookback window
///
/// Produces `floor(span_hours * 60 / 10) + 1` boundaries spaced exactly
/// 10 minutes apart, the last equal to `window_end`.
pub fn plan_buckets(window_end: DateTime<Utc>, span_hours: f64) -> Vec<Bucket> {
    let increments = (span_hours * 60.0 / BUCKET_MINUTES as f64) as i64;
    let first = window_end - span_duration(span_hours);

    (0..=increments)
        .map(|i| Bucket::new(first + Duration::minutes(BUCKET_MINUTES * i)))
        .collect()
}

/// Validate that a span is a positive number of hours
pub fn validate_span(span_hours: f64) -> Result<f64> {
    if !span_hours.is_finite() || span_hours <= 0.0 {
        return Err(ValidationError::NonPositiveSpan(span_hours).into());
    }
    Ok(span_hours)
}

/// Parse a `YYYY-MM-DD` sample date
pub fn parse_sample_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::BadDate(date.to_string()).into())
}

/// Parse a `HH:MM:SS` sample time
pub fn parse_sample_time(time: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M:%S")
        .map_err(|_| ValidationError::BadTime(time.to_string()).into())
}

/// Combine validated date and time strings into the reference instant
pub fn parse_sample_instant(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let date = parse_sample_date(date)?;
    let time = parse_sample_time(time)?;
    Ok(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_one_hour_span_yields_seven_buckets() {
        let buckets = plan_buckets(reference(), 1.0);

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets.last().unwrap().boundary(), reference());
        assert_eq!(
            buckets.first().unwrap().boundary(),
            reference() - Duration::hours(1)
        );
        for pair in buckets.windows(2) {
            assert_eq!(pair[1].boundary() - pair[0].boundary(), Duration::minutes(10));
        }
    }

    #[test]
    fn test_fractional_span_truncates_increments() {
        // 0.5h = 3 increments, 4 buckets; 0.25h = 1 increment (floor), 2 buckets
        assert_eq!(plan_buckets(reference(), 0.5).len(), 4);
        assert_eq!(plan_buckets(reference(), 0.25).len(), 2);
    }

    #[test]
    fn test_query_window_carries_lookback_pad() {
        let window = query_window(reference(), 1.0);

        assert_eq!(window.end, reference());
        assert_eq!(
            window.start,
            reference() - Duration::hours(1) - Duration::minutes(10)
        );
    }

    #[test]
    fn test_first_bucket_window_inside_query_window() {
        let window = query_window(reference(), 2.5);
        let buckets = plan_buckets(reference(), 2.5);

        let first = buckets.first().unwrap().window();
        assert!(first.start >= window.start);
        assert!(first.end <= window.end);
    }

    #[test]
    fn test_span_validation() {
        assert!(validate_span(1.0).is_ok());
        assert!(validate_span(0.0).is_err());
        assert!(validate_span(-2.0).is_err());
        assert!(validate_span(f64::NAN).is_err());
    }

    #[test]
    fn test_date_time_parsing() {
        assert!(parse_sample_date("2021-03-01").is_ok());
        assert!(parse_sample_date("03/01/2021").is_err());
        assert!(parse_sample_time("12:30:00").is_ok());
        assert!(parse_sample_time("12:30").is_err());

        let instant = parse_sample_instant("2021-03-01", "12:00:00").unwrap();
        assert_eq!(instant, reference());
    }
}
