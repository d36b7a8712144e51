//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// Default measurement name (also the line marker).
pub const DEFAULT_MEASUREMENT: &str = "mydatameasurement";

/// Default seconds to wait at EOF before polling again.
pub const DEFAULT_WAIT_SECS: u64 = 60;

/// Default HTTP timeout for a single write, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Field names of the default measurement schema, in line order.
pub const DEFAULT_FIELDS: [&str; 15] = [
    "T1",
    "T2",
    "T3",
    "T4",
    "Pwr1",
    "Pwr2",
    "Pwr3",
    "Pwr4",
    "LEDamp",
    "LEDwidth",
    "Threshold",
    "V1",
    "V2",
    "V3",
    "V4",
];

/// Connection settings for the InfluxDB v1 write endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InfluxConfig {
    /// Host name or address of the InfluxDB server.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Target database (`db` query parameter).
    pub database: String,
    /// Optional user (`u` query parameter).
    pub username: Option<String>,
    /// Optional password (`p` query parameter).
    pub password: Option<String>,
    /// Timeout for a single write request, in seconds.
    pub timeout_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8086,
            database: "influxdb_name".to_string(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl InfluxConfig {
    /// Build the `/write` URL, embedding credentials when both are set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if host or port do not form a valid URL.
    pub fn write_url(&self) -> Result<Url, ConfigError> {
        let base = format!("http://{}:{}/write", self.host, self.port);
        let mut url = Url::parse(&base).map_err(|source| ConfigError::InvalidUrl {
            url: base.clone(),
            source,
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("db", &self.database);
            if let (Some(user), Some(password)) = (&self.username, &self.password) {
                query.append_pair("u", user);
                query.append_pair("p", password);
            }
        }

        Ok(url)
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the forwarder.
///
/// Built once at startup and shared read-only with the engine, the codec
/// and the sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Measurement name; lines must start with it to be candidates.
    pub measurement: String,
    /// Schema field names between the host and the timestamp.
    pub fields: Vec<String>,
    /// Seconds to wait at EOF before the next read / rotation check.
    pub wait_secs: u64,
    /// Diagnostic log file. Defaults to `feed_<measurement>_to_InfluxDBv1.log`.
    pub log_file: Option<PathBuf>,
    /// Remote endpoint settings.
    pub influx: InfluxConfig,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            measurement: DEFAULT_MEASUREMENT.to_string(),
            fields: DEFAULT_FIELDS.iter().map(ToString::to_string).collect(),
            wait_secs: DEFAULT_WAIT_SECS,
            log_file: None,
            influx: InfluxConfig::default(),
        }
    }
}

impl ForwarderConfig {
    /// Wait interval as a `Duration`.
    #[must_use]
    pub fn wait_interval(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Path of the diagnostic log file.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("feed_{}_to_InfluxDBv1.log", self.measurement)))
    }

    /// Check the invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an empty measurement, an empty or
    /// blank field list, a measurement containing the delimiter, or a zero
    /// timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.measurement.is_empty() {
            return Err(ConfigError::Invalid("measurement must not be empty".into()));
        }
        if self.measurement.contains(',') {
            return Err(ConfigError::Invalid(format!(
                "measurement must not contain ',': {}",
                self.measurement
            )));
        }
        if self.fields.is_empty() {
            return Err(ConfigError::Invalid("at least one field is required".into()));
        }
        if let Some(blank) = self.fields.iter().position(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("field {blank} has an empty name")));
        }
        if self.influx.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        self.influx.write_url()?;
        Ok(())
    }
}
