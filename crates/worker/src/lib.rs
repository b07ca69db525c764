//! Support code for the `quill-worker` binary.
//!
//! Kept in a library so the pieces that touch the process environment
//! (input, signals, logging, output files) can be tested without running
//! the binary.

pub mod input;
pub mod output;
pub mod shutdown;
pub mod telemetry;
