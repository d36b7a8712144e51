//! Point sender: delivers serialized records to the metrics store.

mod client;

pub use client::*;
