//! Core data types for the storage layer.
//!
//! - [`Sample`]: one latency observation keyed by its tick instant
//!
//! Timestamps are persisted as fixed-width RFC 3339 UTC text with millisecond
//! precision, so ordering the text column orders the samples in time.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::storage::StorageError;

/// A latency observation stored in the `ping` table.
///
/// Every scheduled tick produces exactly one sample. A failed probe is still
/// a valid observation and is kept with `latency_ms: None`, never as `0.0`.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use pinglog::Sample;
///
/// let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap();
/// let ok = Sample::success(ts, 12.5);
/// let lost = Sample::failure(ts);
///
/// assert_eq!(ok.latency_ms, Some(12.5));
/// assert!(!lost.is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Tick instant the sample belongs to (UTC).
    pub ts: DateTime<Utc>,
    /// Round-trip latency in milliseconds, absent when the probe failed.
    pub latency_ms: Option<f64>,
}

impl Sample {
    /// Create a sample.
    ///
    /// Negative or non-finite latencies cannot be real round trips and are
    /// stored as absent.
    pub fn new(ts: DateTime<Utc>, latency_ms: Option<f64>) -> Self {
        Self {
            ts,
            latency_ms: latency_ms.filter(|v| v.is_finite() && *v >= 0.0),
        }
    }

    /// Sample for a probe that returned a latency.
    pub fn success(ts: DateTime<Utc>, latency_ms: f64) -> Self {
        Self::new(ts, Some(latency_ms))
    }

    /// Sample for a probe that failed or timed out.
    pub fn failure(ts: DateTime<Utc>) -> Self {
        Self::new(ts, None)
    }

    /// Whether the probe produced a latency.
    pub fn is_success(&self) -> bool {
        self.latency_ms.is_some()
    }
}

/// Encode a timestamp for the `created_at` column.
pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a `created_at` value.
///
/// Accepts RFC 3339 and the space-separated naive form
/// (`2024-01-01 00:00:10[.ffffff]`), which is read as UTC.
pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| StorageError::InvalidData(format!("invalid created_at '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_rejects_impossible_latency() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Sample::new(ts, Some(-1.0)).latency_ms, None);
        assert_eq!(Sample::new(ts, Some(f64::NAN)).latency_ms, None);
        assert_eq!(Sample::new(ts, Some(f64::INFINITY)).latency_ms, None);
        assert_eq!(Sample::new(ts, Some(0.0)).latency_ms, Some(0.0));
    }

    #[test]
    fn test_encode_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();

        assert_eq!(encode_timestamp(a), "2024-01-01T00:00:10.000Z");
        assert_eq!(encode_timestamp(a).len(), encode_timestamp(b).len());
        assert!(encode_timestamp(a) < encode_timestamp(b));
    }

    #[test]
    fn test_decode_timestamp_rfc3339() {
        let ts = decode_timestamp("2024-01-01T00:00:10.000Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap());

        let offset = decode_timestamp("2024-01-01T09:00:10+09:00").unwrap();
        assert_eq!(offset, ts);
    }

    #[test]
    fn test_decode_timestamp_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap();
        assert_eq!(decode_timestamp("2024-01-01 00:00:10").unwrap(), expected);
        assert_eq!(
            decode_timestamp("2024-01-01 00:00:10.000000").unwrap(),
            expected
        );
    }

    #[test]
    fn test_decode_timestamp_invalid() {
        let err = decode_timestamp("yesterday").unwrap_err();
        assert!(err.to_string().contains("invalid created_at"));
    }
}
