//! Forwarder module: tailing state machine and its runner.

mod runner;
mod state;

pub use runner::*;
pub use state::*;
