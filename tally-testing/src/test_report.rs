//! Test reporting module
//!
//! Folds classified outcomes into per-category tallies and renders them.
//!
//! The record format is consumed by automation and must stay byte-for-byte
//! stable:
//!
//! ```text
//! {unit,P,F,E,integration,P,F,E,system,P,F,E,total,P,F,E}
//! ```
//!
//! Verbose mode prefixes the first field with `verbose,` and prints one line
//! per test case before the record.

use std::fmt::Write as _;
use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::error::Result;
use crate::test_discovery::TestCategory;
use crate::test_result::Outcome;
use crate::test_runner::TestRecord;

/// Categories that appear in the record, in output order
pub const RECORD_CATEGORIES: [TestCategory; 3] = [TestCategory::Unit, TestCategory::Integration, TestCategory::System];

/// Pass/fail/error counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTally {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

impl CategoryTally {
    pub fn new(passed: usize, failed: usize, errored: usize) -> Self {
        Self { passed, failed, errored }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail { .. } => self.failed += 1,
            Outcome::Error { .. } => self.errored += 1,
        }
    }

    pub fn count(&self) -> usize {
        self.passed + self.failed + self.errored
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

impl Add for CategoryTally {
    type Output = CategoryTally;

    fn add(self, other: CategoryTally) -> CategoryTally {
        CategoryTally {
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            errored: self.errored + other.errored,
        }
    }
}

impl AddAssign for CategoryTally {
    fn add_assign(&mut self, other: CategoryTally) {
        *self = *self + other;
    }
}

/// Aggregated result of one harness run
#[derive(Debug, Clone)]
pub struct RunReport {
    verbose: bool,
    tallies: [CategoryTally; 4],
    total: CategoryTally,
    records: Vec<TestRecord>,
}

impl RunReport {
    /// Fold records left to right into category and total tallies
    pub fn aggregate(records: impl IntoIterator<Item = TestRecord>, verbose: bool) -> Self {
        let records: Vec<TestRecord> = records.into_iter().collect();
        let mut tallies = [CategoryTally::default(); 4];
        let mut total = CategoryTally::default();

        for record in &records {
            tallies[record.case.module.category.index()].record(&record.outcome);
            total.record(&record.outcome);
        }

        Self {
            verbose,
            tallies,
            total,
            records,
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn tally(&self, category: TestCategory) -> CategoryTally {
        self.tallies[category.index()]
    }

    pub fn total(&self) -> CategoryTally {
        self.total
    }

    /// Per-case records in execution order
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn is_success(&self) -> bool {
        self.total.is_clean()
    }

    /// `0` when nothing failed or errored, `1` otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Renders a [`RunReport`] for output
pub trait TestReporter {
    fn render(&self, report: &RunReport) -> Result<String>;
}

/// The single-line record format
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordReporter;

impl RecordReporter {
    pub fn new() -> Self {
        Self
    }
}

fn write_tally(out: &mut String, label: &str, tally: CategoryTally) {
    let _ = write!(out, "{},{},{},{}", label, tally.passed, tally.failed, tally.errored);
}

/// `{unit,..,integration,..,system,..,total,..}`, with `verbose,` in front in verbose mode
pub fn format_record(report: &RunReport) -> String {
    let mut out = String::from("{");
    if report.verbose() {
        out.push_str("verbose,");
    }
    for category in RECORD_CATEGORIES {
        write_tally(&mut out, category.as_str(), report.tally(category));
        out.push(',');
    }
    write_tally(&mut out, "total", report.total());
    out.push('}');
    out
}

impl TestReporter for RecordReporter {
    fn render(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        if report.verbose() {
            for record in report.records() {
                let _ = writeln!(out, "{} ... {}", record.case.qualified_name(), record.outcome);
            }
            write_tally(
                &mut out,
                TestCategory::Uncategorized.as_str(),
                report.tally(TestCategory::Uncategorized),
            );
            out.push('\n');
        }
        out.push_str(&format_record(report));
        out.push('\n');
        Ok(out)
    }
}

/// JSON test reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct JsonTally {
    unit: CategoryTally,
    integration: CategoryTally,
    system: CategoryTally,
    uncategorized: CategoryTally,
    total: CategoryTally,
}

#[derive(Serialize)]
struct JsonTest<'a> {
    name: String,
    category: TestCategory,
    duration_ms: u64,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    tallies: JsonTally,
    tests: Vec<JsonTest<'a>>,
}

impl TestReporter for JsonReporter {
    fn render(&self, report: &RunReport) -> Result<String> {
        let json = JsonReport {
            success: report.is_success(),
            tallies: JsonTally {
                unit: report.tally(TestCategory::Unit),
                integration: report.tally(TestCategory::Integration),
                system: report.tally(TestCategory::System),
                uncategorized: report.tally(TestCategory::Uncategorized),
                total: report.total(),
            },
            tests: report
                .records()
                .iter()
                .map(|record| JsonTest {
                    name: record.case.qualified_name(),
                    category: record.case.module.category,
                    duration_ms: u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
                    outcome: &record.outcome,
                })
                .collect(),
        };

        let mut out = serde_json::to_string_pretty(&json)?;
        out.push('\n');
        Ok(out)
    }
}
