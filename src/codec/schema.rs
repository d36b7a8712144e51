//! Line schema and parser.

use crate::config::ForwarderConfig;

use super::error::CodecError;
use super::record::Record;
use super::timestamp::iso_z_to_ns;

/// Column delimiter.
const DELIMITER: char = ',';

/// Why a line produced no record without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Line does not start with the measurement marker.
    NotCandidate,
    /// Candidate line with the wrong number of columns.
    FieldCount { expected: usize, found: usize },
}

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Well-formed candidate.
    Record(Record),
    /// Not for us, or an incomplete write. Not an error.
    Skip(SkipReason),
    /// Passed the column-count check but cannot be decoded.
    Malformed(CodecError),
}

/// Layout of a measurement line:
/// `<marker>,<host>,<field 1>,...,<field N>,<YYYY-MM-DDTHH:MM:SSZ>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    measurement: String,
    fields: Vec<String>,
}

impl RecordSchema {
    #[must_use]
    pub fn new(measurement: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            measurement: measurement.into(),
            fields,
        }
    }

    #[must_use]
    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self::new(config.measurement.clone(), config.fields.clone())
    }

    /// Columns a candidate line must have: marker, host, fields, timestamp.
    #[must_use]
    pub fn expected_columns(&self) -> usize {
        2 + self.fields.len() + 1
    }

    /// Whether `line` starts with the marker.
    #[must_use]
    pub fn is_candidate(&self, line: &str) -> bool {
        line.starts_with(&self.measurement)
    }

    /// Parse one trimmed line.
    #[must_use]
    pub fn parse(&self, line: &str) -> ParseOutcome {
        if !self.is_candidate(line) {
            return ParseOutcome::Skip(SkipReason::NotCandidate);
        }

        let parts: Vec<&str> = line.split(DELIMITER).collect();
        let expected = self.expected_columns();
        if parts.len() != expected {
            return ParseOutcome::Skip(SkipReason::FieldCount {
                expected,
                found: parts.len(),
            });
        }

        let host = parts[1];
        if host.is_empty() {
            return ParseOutcome::Malformed(CodecError::EmptyHost);
        }

        let timestamp_ns = match iso_z_to_ns(parts[expected - 1]) {
            Ok(ns) => ns,
            Err(e) => return ParseOutcome::Malformed(e),
        };

        let fields = self
            .fields
            .iter()
            .zip(&parts[2..expected - 1])
            .map(|(name, value)| (name.clone(), (*value).to_string()))
            .collect();

        ParseOutcome::Record(Record {
            measurement: self.measurement.clone(),
            host: host.to_string(),
            fields,
            timestamp_ns,
        })
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::from_config(&ForwarderConfig::default())
    }
}
