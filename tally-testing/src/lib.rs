//! Test harness for tally toolchains
//!
//! Finds test modules under a root directory, runs every test function behind
//! a fault-containment boundary, classifies each outcome as pass, fail or
//! error, and reports per-category tallies.

pub mod error;
pub mod test_discovery;
pub mod test_report;
pub mod test_result;
pub mod test_runner;

pub use error::{HarnessError, Result};
pub use test_discovery::{discover, TestCase, TestCategory, TestModule};
pub use test_report::{format_record, CategoryTally, JsonReporter, RecordReporter, RunReport, TestReporter};
pub use test_result::{classify, Outcome, RawResult};
pub use test_runner::{TestRecord, TestRunner, TestRunnerConfig, DEFAULT_TIMEOUT, WORKER_THREAD_PREFIX};
