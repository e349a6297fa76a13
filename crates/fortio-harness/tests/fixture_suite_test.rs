//! Runs the checked-in fixture sets under `tests/fixtures/`.

use std::path::PathBuf;

use fortio_harness::structured_log::{LogEmitter, LogLevel, validate_log_file};
use fortio_harness::verify::VerificationSummary;
use fortio_harness::{ConformanceReport, FixtureSet, TestRunner};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures")
}

fn load() -> Vec<FixtureSet> {
    let sets = FixtureSet::load_dir(&fixture_dir()).expect("fixture sets load");
    assert!(!sets.is_empty(), "no fixture sets under {}", fixture_dir().display());
    sets
}

#[test]
fn all_fixture_cases_pass() {
    let runner = TestRunner::new("fixture-suite");
    let results: Vec<_> = load().iter().flat_map(|set| runner.run(set)).collect();
    let summary = VerificationSummary::from_results(results);
    let failures: Vec<String> = summary
        .failures()
        .map(|r| {
            format!(
                "{} (iostat {} vs {}):\n{}",
                r.case_name,
                r.expected_iostat,
                r.actual_iostat,
                r.diff.as_deref().unwrap_or("")
            )
        })
        .collect();
    assert!(failures.is_empty(), "{}", failures.join("\n"));
    assert!(summary.total >= 30);
}

#[test]
fn operation_filter_limits_cases() {
    let runner = TestRunner::new("fixture-suite").only("lifecycle");
    let sets = load();
    let total: usize = sets.iter().map(|s| runner.run(s).len()).sum();
    let expected: usize = sets
        .iter()
        .flat_map(|s| &s.cases)
        .filter(|c| c.operation == "lifecycle")
        .count();
    assert_eq!(total, expected);
    assert!(total > 0);
}

#[test]
fn report_and_log_for_a_run() {
    let runner = TestRunner::new("fixture-suite").only("format_write");
    let results: Vec<_> = load().iter().flat_map(|set| runner.run(set)).collect();

    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("run.jsonl");
    let mut emitter = LogEmitter::to_file(&log_path, "fixture-suite", "run-1").expect("log file");
    emitter.emit(LogLevel::Info, "verify_start").expect("emit");
    emitter.emit_results(&results).expect("emit results");
    emitter.flush().expect("flush");
    drop(emitter);

    let (lines, errors) = validate_log_file(&log_path).expect("read log");
    assert_eq!(lines, results.len() + 1);
    assert!(errors.is_empty(), "{errors:?}");

    let report = ConformanceReport {
        title: "fortio".to_string(),
        timestamp: "2026-10-01T00:00:00Z".to_string(),
        summary: VerificationSummary::from_results(results),
    };
    let md = report.to_markdown();
    assert!(md.contains("| integer_and_fixed_fields | edit I, F | 0 | PASS |"));
    assert!(!md.contains("## Failures"));
}
