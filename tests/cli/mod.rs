//! Tests that drive the `txt-feeder` binary.

mod run_test;
