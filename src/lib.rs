//! Golden-file test harness for the `lev` executable.
//!
//! Each test file carries its own command-line arguments (`// RUN-ARGS:`) and
//! its expected standard output (`// CHECK-STDOUT:`). [`Runner`] checks every
//! file in a directory, or regenerates the expectations in update mode.

pub mod config;
pub mod diff;
pub mod report;
pub mod runner;
pub mod test_file;

pub use config::{Config, Whitespace};
pub use report::{FileStatus, RunSummary};
pub use runner::{Action, Runner};
pub use test_file::{Mismatch, TestFile, TestOutcome};
