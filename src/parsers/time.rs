//! Browser epoch decoding.
//!
//! Chromium stores visit times as microseconds since 1601-01-01 UTC (the
//! WebKit/Windows FILETIME epoch). Safari stores Core Data timestamps: seconds,
//! possibly fractional, since 2001-01-01 UTC. Both decode to whole seconds;
//! sub-second precision is intentionally discarded.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::parsers::browser::{BrowserKind, RawTimestamp};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const WEBKIT_UNIX_OFFSET_SECS: i64 = 11_644_473_600;
/// Seconds between 1970-01-01 and 2001-01-01.
pub const COCOA_UNIX_OFFSET_SECS: i64 = 978_307_200;

const MICROS_PER_SEC: i64 = 1_000_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimestampError {
    #[error("timestamp is missing")]
    Missing,
    #[error("timestamp is not numeric: {0:?}")]
    NotNumeric(String),
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

enum Numeric {
    Int(i64),
    Float(f64),
}

/// Decode a raw timestamp column value for the given browser.
pub fn decode_timestamp(
    raw: &RawTimestamp,
    kind: BrowserKind,
) -> Result<DateTime<Utc>, TimestampError> {
    let value = numeric(raw)?;
    match (kind, value) {
        (BrowserKind::Chromium, Numeric::Int(micros)) => webkit_timestamp_to_datetime(micros),
        (BrowserKind::Chromium, Numeric::Float(micros)) => {
            let secs = round_half_up(micros / MICROS_PER_SEC as f64)?;
            unix_seconds_to_datetime(secs.checked_sub(WEBKIT_UNIX_OFFSET_SECS), micros)
        }
        (BrowserKind::Safari, Numeric::Int(secs)) => {
            unix_seconds_to_datetime(secs.checked_add(COCOA_UNIX_OFFSET_SECS), secs)
        }
        (BrowserKind::Safari, Numeric::Float(secs)) => cocoa_timestamp_to_datetime(secs),
    }
}

/// Microseconds since 1601-01-01, rounded to the nearest second (halves round up).
pub fn webkit_timestamp_to_datetime(microseconds: i64) -> Result<DateTime<Utc>, TimestampError> {
    let mut secs = microseconds.div_euclid(MICROS_PER_SEC);
    if microseconds.rem_euclid(MICROS_PER_SEC) >= MICROS_PER_SEC / 2 {
        secs += 1;
    }
    unix_seconds_to_datetime(secs.checked_sub(WEBKIT_UNIX_OFFSET_SECS), microseconds)
}

/// Seconds since 2001-01-01, rounded to the nearest second (halves round up).
pub fn cocoa_timestamp_to_datetime(seconds: f64) -> Result<DateTime<Utc>, TimestampError> {
    let secs = round_half_up(seconds)?;
    unix_seconds_to_datetime(secs.checked_add(COCOA_UNIX_OFFSET_SECS), seconds)
}

fn numeric(raw: &RawTimestamp) -> Result<Numeric, TimestampError> {
    match raw {
        RawTimestamp::Null => Err(TimestampError::Missing),
        RawTimestamp::Integer(i) => Ok(Numeric::Int(*i)),
        RawTimestamp::Real(f) if f.is_nan() => Err(TimestampError::NotNumeric(f.to_string())),
        RawTimestamp::Real(f) => Ok(Numeric::Float(*f)),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TimestampError::Missing);
            }
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Numeric::Int(i));
            }
            match text.parse::<f64>() {
                Ok(f) if !f.is_nan() => Ok(Numeric::Float(f)),
                _ => Err(TimestampError::NotNumeric(text.to_string())),
            }
        }
    }
}

fn round_half_up(value: f64) -> Result<i64, TimestampError> {
    let rounded = (value + 0.5).floor();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound must be exclusive.
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(TimestampError::OutOfRange(value.to_string()));
    }
    Ok(rounded as i64)
}

fn unix_seconds_to_datetime(
    secs: Option<i64>,
    raw: impl std::fmt::Display,
) -> Result<DateTime<Utc>, TimestampError> {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .ok_or_else(|| TimestampError::OutOfRange(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_chromium_reference_instant() {
        let dt = decode_timestamp(&RawTimestamp::Integer(13_300_000_000_000_000), BrowserKind::Chromium)
            .expect("decode");
        assert_eq!(dt, Utc.with_ymd_and_hms(2022, 6, 18, 4, 26, 40).unwrap());
    }

    #[test]
    fn chromium_rounds_to_nearest_second() {
        let base = Utc.with_ymd_and_hms(2022, 6, 18, 4, 26, 40).unwrap();
        let below = webkit_timestamp_to_datetime(13_300_000_000_499_999).expect("below");
        let half = webkit_timestamp_to_datetime(13_300_000_000_500_000).expect("half");
        assert_eq!(below, base);
        assert_eq!(half, base + chrono::Duration::seconds(1));
    }

    #[test]
    fn chromium_zero_is_the_epoch() {
        let dt = webkit_timestamp_to_datetime(0).expect("epoch");
        assert_eq!(dt, Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn decodes_safari_fractional_seconds() {
        let dt = decode_timestamp(&RawTimestamp::Real(700_000_000.4), BrowserKind::Safari)
            .expect("decode");
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 3, 8, 20, 26, 40).unwrap());

        let dt = decode_timestamp(&RawTimestamp::Real(700_000_000.5), BrowserKind::Safari)
            .expect("decode");
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 3, 8, 20, 26, 41).unwrap());
    }

    #[test]
    fn decodes_numeric_text() {
        let dt = decode_timestamp(&RawTimestamp::Text(" 700000000 ".to_string()), BrowserKind::Safari)
            .expect("decode");
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 3, 8, 20, 26, 40).unwrap());
    }

    #[test]
    fn reports_failures_as_data() {
        assert_eq!(
            decode_timestamp(&RawTimestamp::Null, BrowserKind::Chromium),
            Err(TimestampError::Missing)
        );
        assert!(matches!(
            decode_timestamp(&RawTimestamp::Text("yesterday".to_string()), BrowserKind::Safari),
            Err(TimestampError::NotNumeric(_))
        ));
        assert!(matches!(
            decode_timestamp(&RawTimestamp::Integer(i64::MAX), BrowserKind::Chromium),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            decode_timestamp(&RawTimestamp::Integer(i64::MAX), BrowserKind::Safari),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            decode_timestamp(&RawTimestamp::Real(f64::INFINITY), BrowserKind::Safari),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            decode_timestamp(&RawTimestamp::Real(f64::NAN), BrowserKind::Safari),
            Err(TimestampError::NotNumeric(_))
        ));
    }
}
