//! ISO-8601 `Z` timestamp conversion.

use chrono::NaiveDateTime;

use super::error::CodecError;

/// Accepted layout, e.g. `2025-06-09T21:58:12Z`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const TIMESTAMP_LEN: usize = 20;

/// Convert `YYYY-MM-DDTHH:MM:SSZ` (UTC) to nanoseconds since the Unix epoch.
///
/// The layout is checked byte for byte before parsing; chrono alone would
/// accept variants such as single-digit months.
///
/// # Errors
///
/// Returns `CodecError::InvalidTimestamp` for anything but the exact layout
/// or an impossible date, and `CodecError::TimestampOutOfRange` if the
/// instant cannot be expressed as `i64` nanoseconds.
pub fn iso_z_to_ns(value: &str) -> Result<i64, CodecError> {
    let invalid = |reason: &str| CodecError::InvalidTimestamp {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let bytes = value.as_bytes();
    if bytes.len() != TIMESTAMP_LEN {
        return Err(invalid("expected 20 characters"));
    }
    for (i, b) in bytes.iter().enumerate() {
        let ok = match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        };
        if !ok {
            return Err(invalid("expected YYYY-MM-DDTHH:MM:SSZ"));
        }
    }

    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| invalid(&e.to_string()))?;

    naive
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| CodecError::TimestampOutOfRange(value.to_string()))
}
