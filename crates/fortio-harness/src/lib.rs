//! Conformance harness for fortio-core.
//!
//! This crate provides:
//! - Fixtures: JSON cases describing format transfers and unit lifecycles
//! - Runner: executes each case against the runtime and captures its output
//! - Verify: compares captured output and IOSTAT against the fixture
//! - Report generation: human-readable + machine-readable conformance reports
//! - Structured logs: JSONL records of each harness run

#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::VerificationResult;
