//! txt-feeder - tail rotating `*.txt` measurement logs into InfluxDB v1.

pub mod codec;
pub mod config;
pub mod display;
pub mod forwarder;
pub mod logging;
pub mod sender;
pub mod watcher;
