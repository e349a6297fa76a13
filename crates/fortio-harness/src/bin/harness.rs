//! CLI entrypoint for the fortio conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fortio_core::{Runtime, Value};
use fortio_harness::structured_log::{LogEmitter, LogLevel, validate_log_file};
use fortio_harness::verify::VerificationSummary;
use fortio_harness::{ConformanceReport, FixtureSet, TestRunner};

/// Conformance tooling for fortio.
#[derive(Debug, Parser)]
#[command(name = "fortio-harness")]
#[command(about = "Fixture-driven conformance harness for the fortio I/O runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the runtime against fixture files.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; a JSON twin is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
        /// JSONL log of every case result.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Only run cases of this operation.
        #[arg(long)]
        operation: Option<String>,
    },
    /// Write values through a format and print the records.
    Render {
        /// Format literal, e.g. "(I5,F6.2)"; list-directed when absent.
        #[arg(long)]
        format: Option<String>,
        /// JSON array of values, e.g. '[{"integer":42},{"real":3.14}]'.
        #[arg(long)]
        values: String,
        /// Suppress the blank between list-directed items.
        #[arg(long)]
        no_separators: bool,
    },
    /// Print what INQUIRE reports about a file.
    Inquire {
        #[arg(long)]
        file: PathBuf,
    },
    /// Check a JSONL log against the log schema.
    ValidateLog {
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            report,
            log,
            operation,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let fixture_sets = FixtureSet::load_dir(&fixture)?;
            if fixture_sets.is_empty() {
                return Err(format!("No fixture JSON files found in {}", fixture.display()).into());
            }

            let mut runner = TestRunner::new("fixture-verify");
            if let Some(op) = operation {
                runner = runner.only(op);
            }
            let mut results = Vec::new();
            for set in &fixture_sets {
                results.extend(runner.run(set));
            }

            if let Some(log_path) = log {
                let run_id = format!("run-{}", std::process::id());
                let mut emitter = LogEmitter::to_file(&log_path, &runner.campaign, &run_id)?;
                emitter.emit(LogLevel::Info, "verify_start")?;
                emitter.emit_results(&results)?;
                emitter.emit(LogLevel::Info, "verify_end")?;
                emitter.flush()?;
                eprintln!("Wrote log to {}", log_path.display());
            }

            let summary = VerificationSummary::from_results(results);
            let report_doc = ConformanceReport {
                title: String::from("fortio Conformance Report"),
                timestamp: fortio_harness::structured_log::now_utc(),
                summary,
            };

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );
            for failure in report_doc.summary.failures() {
                eprintln!("FAIL {} ({})", failure.case_name, failure.section);
            }

            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                let json_path = report_path.with_extension("json");
                std::fs::write(&json_path, report_doc.to_json())?;
            }

            if !report_doc.summary.all_passed() {
                return Err("Conformance verification failed".into());
            }
        }
        Command::Render {
            format,
            values,
            no_separators,
        } => {
            let values: Vec<Value> = serde_json::from_str(&values)?;
            let run = fortio_harness::runner::render_values(format.as_deref(), &values, !no_separators);
            println!("{}", run.output);
            if run.iostat != 0 {
                return Err(format!("IOSTAT={}", run.iostat).into());
            }
        }
        Command::Inquire { file } => {
            let report = Runtime::default().inquire_file(&file);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::ValidateLog { path } => {
            let (lines, errors) = validate_log_file(&path)?;
            for err in &errors {
                eprintln!("{err}");
            }
            eprintln!("{lines} lines, {} errors", errors.len());
            if !errors.is_empty() {
                return Err("log validation failed".into());
            }
        }
    }

    Ok(())
}
