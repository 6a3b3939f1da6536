//! tiobench harness - correctness checks for the tio server under load
//!
//! Launches the tio server and the tiobench driver, parses the driver's
//! completion report and reads the resulting container state back through
//! the tio protocol to confirm nothing was lost.

pub mod cli;
pub mod commands;
pub mod common;
pub mod process;
pub mod report;
pub mod testing;
pub mod tio;

// Re-export commonly used types for tests
pub use common::{Error, Result, WorkloadConfig};
