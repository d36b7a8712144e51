//! Record codec: measurement line in, line protocol out.

mod error;
mod record;
mod schema;
mod timestamp;

pub use error::CodecError;
pub use record::Record;
pub use schema::{ParseOutcome, RecordSchema, SkipReason};
pub use timestamp::iso_z_to_ns;
