//! End-to-end runs over real `.tl` trees

use std::fs;
use std::path::Path;
use std::time::Duration;

use tally_core::Value;
use tally_script::ScriptToolchain;
use tally_testing::{
    format_record, CategoryTally, Outcome, RecordReporter, RunReport, TestCategory, TestReporter, TestRunner,
    TestRunnerConfig,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, source: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, source).unwrap();
}

fn run(root: &Path, config: TestRunnerConfig) -> RunReport {
    TestRunner::new(ScriptToolchain::new(), config).run_suite(root).unwrap()
}

fn run_default(root: &Path) -> RunReport {
    run(root, TestRunnerConfig::default())
}

#[test]
fn unit_pass_and_fail() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "unit/a_test.tl",
        "(defn test_ok () (assert-equal 1 1))\n(defn test_bad () (assert-equal 1 2))\n",
    );

    let report = run_default(dir.path());
    assert_eq!(
        format_record(&report),
        "{unit,1,1,0,integration,0,0,0,system,0,0,0,total,1,1,0}"
    );
    assert_eq!(report.exit_code(), 1);

    let bad = &report.records()[1];
    assert_eq!(bad.case.qualified_name(), "unit/a_test.tl::test_bad/0");
    assert_eq!(
        bad.outcome,
        Outcome::Fail {
            actual: Value::Integer(1),
            expected: Value::Integer(2)
        }
    );
}

#[test]
fn system_crash_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "system/b_test.tl", "(defn test_crash () (div 1 0))\n");

    let report = run_default(dir.path());
    assert_eq!(
        format_record(&report),
        "{unit,0,0,0,integration,0,0,0,system,0,0,1,total,0,0,1}"
    );
    assert_eq!(report.exit_code(), 1);
    match &report.records()[0].outcome {
        Outcome::Error { reason, context } => {
            assert_eq!(reason.to_string(), "{badarith}");
            assert_eq!(context, "test_crash");
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn empty_root_reports_zeros() {
    let dir = TempDir::new().unwrap();

    let report = run_default(dir.path());
    assert_eq!(
        format_record(&report),
        "{unit,0,0,0,integration,0,0,0,system,0,0,0,total,0,0,0}"
    );
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn all_passing_exits_zero() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "integration/flow_test.tl",
        "\
(defp double (x) (* x 2))
(defn test_double () (assert-equal (double 21) 42))
(defn test_shape () (assert-match (tuple :ok (double 1)) (tuple :ok :_)))
(defn test_plain_return () :done)
",
    );

    let report = run_default(dir.path());
    assert_eq!(report.tally(TestCategory::Integration), CategoryTally::new(3, 0, 0));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn raising_assertion_is_a_fail() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "unit/strict_test.tl",
        "(defn test_strict () (assert-equal! (+ 1 1) 3) :unreachable)\n",
    );

    let report = run_default(dir.path());
    assert_eq!(report.tally(TestCategory::Unit), CategoryTally::new(0, 1, 0));
    assert_eq!(
        report.records()[0].outcome,
        Outcome::Fail {
            actual: Value::Integer(2),
            expected: Value::Integer(3)
        }
    );
}

#[test]
fn broken_module_does_not_block_others() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "unit/broken_test.tl", "(defn test_a () (assert-equal 1 1)\n");
    write(dir.path(), "unit/good_test.tl", "(defn test_a () (assert-true true))\n");

    let report = run_default(dir.path());
    assert_eq!(report.tally(TestCategory::Unit), CategoryTally::new(1, 0, 1));

    let broken = &report.records()[0];
    assert_eq!(broken.case.qualified_name(), "unit/broken_test.tl::<compile>/0");
    match &broken.outcome {
        Outcome::Error { reason, .. } => assert!(reason.to_string().starts_with("{compile_error,")),
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn panic_in_one_test_leaves_the_rest_running() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "system/mixed_test.tl",
        "\
(defn test_a_panics () (panic \"kaboom\"))
(defn test_b_raises () (raise :custom))
(defn test_c_passes () (assert-not-equal 1 2))
",
    );

    let report = run_default(dir.path());
    assert_eq!(report.tally(TestCategory::System), CategoryTally::new(1, 0, 2));

    let reasons: Vec<String> = report
        .records()
        .iter()
        .map(|r| match &r.outcome {
            Outcome::Error { reason, .. } => reason.to_string(),
            other => other.to_string(),
        })
        .collect();
    assert_eq!(reasons, vec!["{panic,\"kaboom\"}", "custom", "pass"]);
}

#[test]
fn slow_test_times_out() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "unit/slow_test.tl",
        "(defn test_slow () (sleep 5000))\n(defn test_quick () (assert-true true))\n",
    );

    let config = TestRunnerConfig {
        timeout: Some(Duration::from_millis(200)),
        ..TestRunnerConfig::default()
    };
    let report = run(dir.path(), config);
    assert_eq!(report.tally(TestCategory::Unit), CategoryTally::new(1, 0, 1));
}

#[test]
fn uncategorized_counts_only_in_total() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "top_test.tl", "(defn test_ok () (assert-true true))\n");
    write(dir.path(), "misc/other_test.tl", "(defn test_bad () (assert-false true))\n");

    let report = run(
        dir.path(),
        TestRunnerConfig {
            verbose: true,
            ..TestRunnerConfig::default()
        },
    );
    let output = RecordReporter.render(&report).unwrap();
    assert_eq!(
        output,
        "\
misc/other_test.tl::test_bad/0 ... fail: expected false, got true
top_test.tl::test_ok/0 ... pass
uncategorized,1,1,0
{verbose,unit,0,0,0,integration,0,0,0,system,0,0,0,total,1,1,0}
"
    );
}

#[test]
fn repeated_runs_agree() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "unit/a_test.tl", "(defn test_ok () (assert-equal 1 1))\n");
    write(dir.path(), "integration/b_test.tl", "(defn test_bad () (assert-equal :a :b))\n");
    write(dir.path(), "system/c_test.tl", "(defn test_crash () (raise :boom))\n");

    let first = format_record(&run_default(dir.path()));
    let second = format_record(&run_default(dir.path()));
    assert_eq!(first, second);
    assert_eq!(first, "{unit,1,0,0,integration,0,1,0,system,0,0,1,total,1,1,1}");
}

#[test]
fn deeply_nested_module_is_a_compile_error() {
    let dir = TempDir::new().unwrap();
    let depth = 10_000;
    write(
        dir.path(),
        "unit/a_test.tl",
        &format!("(defn test_deep () {}1{})\n", "(do ".repeat(depth), ")".repeat(depth)),
    );
    write(dir.path(), "unit/z_test.tl", "(defn test_ok () (assert-true true))\n");

    let report = run_default(dir.path());
    assert_eq!(
        format_record(&report),
        "{unit,1,0,1,integration,0,0,0,system,0,0,0,total,1,0,1}"
    );

    let deep = &report.records()[0];
    assert_eq!(deep.case.qualified_name(), "unit/a_test.tl::<compile>/0");
    match &deep.outcome {
        Outcome::Error { reason, .. } => assert!(reason.to_string().contains("nesting too deep")),
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn multiline_values_render_on_one_detail_line() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "unit/a_test.tl",
        "(defn test_multiline () (assert-equal \"a\\nb\" \"c\"))\n(defn test_after () (panic \"x\\ny\"))\n",
    );

    let report = run(
        dir.path(),
        TestRunnerConfig {
            verbose: true,
            ..TestRunnerConfig::default()
        },
    );
    let output = RecordReporter.render(&report).unwrap();
    assert_eq!(
        output,
        r#"unit/a_test.tl::test_multiline/0 ... fail: expected "c", got "a\nb"
unit/a_test.tl::test_after/0 ... error: {panic,"x\ny"} in test_after
uncategorized,0,0,0
{verbose,unit,0,1,1,integration,0,0,0,system,0,0,0,total,0,1,1}
"#
    );
}
