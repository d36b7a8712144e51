//! Structured record and its line-protocol form.

use std::fmt::Write as _;

/// One decoded measurement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Measurement name.
    pub measurement: String,
    /// Value of the `host` tag.
    pub host: String,
    /// Field name / raw value pairs in schema order.
    pub fields: Vec<(String, String)>,
    /// Event time in nanoseconds since the Unix epoch (UTC).
    pub timestamp_ns: i64,
}

impl Record {
    /// Render the `name=value,...` field set.
    #[must_use]
    pub fn field_set(&self) -> String {
        let mut out = String::new();
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{name}={value}");
        }
        out
    }

    /// Serialize as `measurement,host=<host> <fields> <timestamp_ns>`.
    ///
    /// Values are emitted verbatim; nothing is escaped.
    #[must_use]
    pub fn to_line_protocol(&self) -> String {
        format!(
            "{},host={} {} {}",
            self.measurement,
            self.host,
            self.field_set(),
            self.timestamp_ns
        )
    }
}
