//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 text in UTC and rendered as ISO-8601
//! in API responses.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_storage(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_storage_format_is_utc_with_z_suffix() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(to_storage(&ts), "2024-03-01T10:30:00.000000Z");
    }

    #[test]
    fn test_storage_format_preserves_instant() {
        let ts = now();
        let parsed = from_storage(&to_storage(&ts)).unwrap();
        assert_eq!(parsed.timestamp_micros(), ts.timestamp_micros());
    }

    #[test]
    fn test_from_storage_rejects_garbage() {
        let err = from_storage("yesterday").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
