//! Codec error types.

/// Reasons a candidate line with the right field count is still unusable.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Timestamp is not of the form `YYYY-MM-DDTHH:MM:SSZ`.
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Timestamp does not fit in signed 64-bit nanoseconds.
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(String),

    /// Host column is empty.
    #[error("Empty host field")]
    EmptyHost,
}
