//! Test execution engine.
//!
//! Three operations are understood:
//! - `format_write`: write `values` through an optional `format` to an
//!   internal unit; output is the records written, one per line.
//! - `format_read`: read `kinds` from internal `records`; output is the
//!   values read, joined by `|`.
//! - `lifecycle`: run a list of `steps` against a fresh runtime whose files
//!   live in a temporary directory; output is one line per step.
//!
//! Every statement runs with `IOSTAT=` so statuses surface as data. A fault
//! renders as `fault: <message>` and ends the case.

use std::path::{Path, PathBuf};

use fortio_core::format::FormatCursor;
use fortio_core::unit::params::parse_blank;
use fortio_core::{
    Completion, Device, DirectiveStream, Fault, FormatProgram, Handlers, InquireReport, IoStat,
    OpenParams, ReadEngine, Runtime, RuntimeConfig, StandardCodec, StatementOptions, Value,
    ValueKind, WriteEngine,
};
use serde::Deserialize;

use crate::diff;
use crate::error::HarnessError;
use crate::fixtures::{FixtureCase, FixtureSet};
use crate::verify::VerificationResult;

/// Runs a fixture set and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    /// Restrict the run to one operation.
    pub operation: Option<String>,
}

impl TestRunner {
    /// Create a new test runner.
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            operation: None,
        }
    }

    #[must_use]
    pub fn only(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Run all fixtures in a set and return results.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .filter(|case| {
                self.operation
                    .as_deref()
                    .is_none_or(|op| op.eq_ignore_ascii_case(&case.operation))
            })
            .map(verify_case)
            .collect()
    }
}

fn verify_case(case: &FixtureCase) -> VerificationResult {
    let (actual, actual_iostat) = match execute_case(case) {
        Ok(run) => (run.output, run.iostat),
        Err(err) => (format!("unsupported: {err}"), 0),
    };
    let passed = actual == case.expected_output && actual_iostat == case.expected_iostat;
    let diff = (!passed).then(|| diff::render_diff(&case.expected_output, &actual));
    VerificationResult {
        case_name: case.name.clone(),
        section: case.section.clone(),
        passed,
        expected: case.expected_output.clone(),
        actual,
        expected_iostat: case.expected_iostat,
        actual_iostat,
        diff,
    }
}

/// What one case produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub output: String,
    /// Status of the last statement; `0` when it completed.
    pub iostat: i32,
}

impl Execution {
    fn fault(fault: &Fault) -> Self {
        Self {
            output: format!("fault: {fault}"),
            iostat: 0,
        }
    }
}

/// Execute one case without judging it.
pub fn execute_case(case: &FixtureCase) -> Result<Execution, HarnessError> {
    match case.operation.as_str() {
        "format_write" => {
            let inputs: WriteInputs = parse_inputs(case)?;
            Ok(render_values(
                inputs.format.as_deref(),
                &inputs.values,
                inputs.separators,
            ))
        }
        "format_read" => run_format_read(case),
        "lifecycle" => run_lifecycle(case),
        other => Err(HarnessError::UnknownOperation {
            case: case.name.clone(),
            operation: other.to_string(),
        }),
    }
}

fn parse_inputs<T: for<'de> Deserialize<'de>>(case: &FixtureCase) -> Result<T, HarnessError> {
    serde_json::from_value(case.inputs.clone()).map_err(|e| bad_input(case, e))
}

fn bad_input(case: &FixtureCase, reason: impl ToString) -> HarnessError {
    HarnessError::BadInput {
        case: case.name.clone(),
        reason: reason.to_string(),
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WriteInputs {
    #[serde(default)]
    format: Option<String>,
    values: Vec<Value>,
    #[serde(default = "yes")]
    separators: bool,
}

#[derive(Debug, Deserialize)]
struct ReadInputs {
    #[serde(default)]
    format: Option<String>,
    records: Vec<String>,
    kinds: Vec<String>,
    #[serde(default)]
    blank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LifecycleInputs {
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Step {
    Open {
        unit: i32,
        #[serde(default)]
        params: OpenParams,
    },
    Close {
        unit: i32,
        #[serde(default)]
        status: Option<String>,
    },
    Write {
        unit: i32,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        values: Vec<Value>,
        #[serde(default)]
        rec: Option<usize>,
    },
    Read {
        unit: i32,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        kinds: Vec<String>,
        #[serde(default)]
        rec: Option<usize>,
    },
    Backspace {
        unit: i32,
    },
    Rewind {
        unit: i32,
    },
    Endfile {
        unit: i32,
    },
    Inquire {
        #[serde(default)]
        unit: Option<i32>,
        #[serde(default)]
        file: Option<PathBuf>,
    },
}

fn compile(format: Option<&str>) -> Result<Option<FormatProgram>, Fault> {
    format.map(FormatProgram::parse).transpose().map_err(Fault::from)
}

fn directives<'a>(cursor: &'a mut Option<FormatCursor<'_>>) -> Option<&'a mut dyn DirectiveStream> {
    cursor.as_mut().map(|c| c as &mut dyn DirectiveStream)
}

/// Kind names: `integer`, `logical`, `real`, `double`, `complex`, `text`,
/// and `text*N` for a fixed-length target.
#[must_use]
pub fn parse_kind(name: &str) -> Option<ValueKind> {
    let name = name.trim().to_ascii_lowercase();
    Some(match name.as_str() {
        "integer" => ValueKind::Integer,
        "logical" => ValueKind::Logical,
        "real" => ValueKind::Real,
        "double" => ValueKind::Double,
        "complex" => ValueKind::Complex,
        "text" => ValueKind::Text,
        other => ValueKind::FixedText(other.strip_prefix("text*")?.parse().ok()?),
    })
}

fn parse_kinds(case: &FixtureCase, names: &[String]) -> Result<Vec<ValueKind>, HarnessError> {
    names
        .iter()
        .map(|n| parse_kind(n).ok_or_else(|| bad_input(case, format!("unknown kind `{n}`"))))
        .collect()
}

/// Text form of a value read back.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Integer(v) => v.to_string(),
        Value::Logical(b) => String::from(if *b { "T" } else { "F" }),
        Value::Real(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Complex(re, im) => format!("({re},{im})"),
        Value::Text(s) => format!("'{s}'"),
    }
}

fn render_inquiry(r: &InquireReport) -> String {
    let opt = |v: Option<usize>| v.map_or_else(|| String::from("-"), |n| n.to_string());
    format!(
        "exists={} opened={} number={} named={} access={} form={} recl={} nextrec={} blank={}",
        r.exists,
        r.opened,
        r.number,
        r.named,
        r.access,
        r.form,
        opt(r.recl),
        opt(r.nextrec),
        r.blank
    )
}

fn write_list(engine: &mut WriteEngine<'_>, values: &[Value]) -> Result<Completion<()>, Fault> {
    for value in values {
        if let Completion::Status(stat) = engine.write(value)? {
            return Ok(Completion::Status(stat));
        }
    }
    Ok(Completion::Done(()))
}

/// Read `kinds` in order, stopping at the first status.
fn read_list(
    engine: &mut ReadEngine<'_>,
    kinds: &[ValueKind],
) -> Result<(Vec<String>, Option<IoStat>), Fault> {
    let mut out = Vec::new();
    for &kind in kinds {
        match engine.read(kind)? {
            Completion::Done(transfer) => out.push(render_value(&transfer.value)),
            Completion::Status(stat) => return Ok((out, Some(stat))),
        }
    }
    Ok((out, None))
}

/// Write `values` to a fresh internal unit and return the records.
#[must_use]
pub fn render_values(format: Option<&str>, values: &[Value], separators: bool) -> Execution {
    let program = match compile(format) {
        Ok(p) => p,
        Err(fault) => return Execution::fault(&fault),
    };
    let codec = StandardCodec;
    let mut device = Device::internal(Vec::<String>::new());
    let mut cursor = program.as_ref().map(FormatProgram::cursor);
    let options = StatementOptions {
        use_separators: separators,
        ..StatementOptions::default()
    }
    .with_handlers(Handlers::IOSTAT);
    let mut engine = WriteEngine::new(&mut device, directives(&mut cursor), &codec, options);
    let outcome = write_list(&mut engine, values).and_then(|c| match c {
        Completion::Done(()) => engine.end_record(),
        Completion::Status(stat) => Ok(Completion::Status(stat)),
    });
    match outcome {
        Ok(Completion::Done(output)) => Execution { output, iostat: 0 },
        Ok(Completion::Status(stat)) => Execution {
            output: String::new(),
            iostat: stat.code(),
        },
        Err(fault) => Execution::fault(&fault),
    }
}

fn run_format_read(case: &FixtureCase) -> Result<Execution, HarnessError> {
    let inputs: ReadInputs = parse_inputs(case)?;
    let kinds = parse_kinds(case, &inputs.kinds)?;
    let blank = parse_blank(inputs.blank.as_deref()).map_err(|stat| bad_input(case, stat))?;
    let program = match compile(inputs.format.as_deref()) {
        Ok(p) => p,
        Err(fault) => return Ok(Execution::fault(&fault)),
    };
    let codec = StandardCodec;
    let mut device = Device::internal(&inputs.records);
    device.set_blank(blank);
    let mut cursor = program.as_ref().map(FormatProgram::cursor);
    let options = StatementOptions::default().with_handlers(Handlers::IOSTAT);
    let mut engine = ReadEngine::new(&mut device, directives(&mut cursor), &codec, options);
    let outcome = read_list(&mut engine, &kinds);
    engine.end_record();
    Ok(match outcome {
        Ok((values, stat)) => Execution {
            output: values.join("|"),
            iostat: stat.map_or(0, IoStat::code),
        },
        Err(fault) => Execution::fault(&fault),
    })
}

/// `op code` or `op code payload`.
fn step_line(op: &str, iostat: i32, payload: Option<String>) -> (String, i32) {
    match payload.filter(|p| !p.is_empty()) {
        Some(p) => (format!("{op} {iostat} {p}"), iostat),
        None => (format!("{op} {iostat}"), iostat),
    }
}

fn status_line(op: &str, outcome: Result<Completion<()>, Fault>) -> Result<(String, i32), Fault> {
    outcome.map(|c| step_line(op, c.iostat(), None))
}

/// Collapse a statement result whose body returned its own statement result.
fn flatten<T>(outer: Result<Completion<Result<T, Fault>>, Fault>) -> Result<Completion<T>, Fault> {
    match outer? {
        Completion::Done(inner) => inner.map(Completion::Done),
        Completion::Status(stat) => Ok(Completion::Status(stat)),
    }
}

fn within(dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        dir.join(file)
    }
}

fn run_lifecycle(case: &FixtureCase) -> Result<Execution, HarnessError> {
    let inputs: LifecycleInputs = parse_inputs(case)?;
    let dir = tempfile::tempdir()?;
    let runtime = Runtime::new(RuntimeConfig {
        scratch_dir: dir.path().to_path_buf(),
        ..RuntimeConfig::default()
    });

    let mut lines = Vec::new();
    let mut iostat = 0;
    for step in &inputs.steps {
        match run_step(case, &runtime, dir.path(), step)? {
            Ok((line, code)) => {
                lines.push(line);
                iostat = code;
            }
            Err(fault) => {
                lines.push(format!("fault: {fault}"));
                break;
            }
        }
    }
    runtime.shutdown();
    Ok(Execution {
        output: lines.join("\n"),
        iostat,
    })
}

fn run_step(
    case: &FixtureCase,
    runtime: &Runtime,
    dir: &Path,
    step: &Step,
) -> Result<Result<(String, i32), Fault>, HarnessError> {
    let h = Handlers::IOSTAT;
    Ok(match step {
        Step::Open { unit, params } => {
            let mut params = params.clone();
            params.file = params.file.map(|f| within(dir, &f));
            status_line("open", runtime.open(*unit, &params, h))
        }
        Step::Close { unit, status } => {
            status_line("close", runtime.close(*unit, status.as_deref(), h))
        }
        Step::Backspace { unit } => status_line("backspace", runtime.backspace(*unit, h)),
        Step::Rewind { unit } => status_line("rewind", runtime.rewind(*unit, h)),
        Step::Endfile { unit } => status_line("endfile", runtime.endfile(*unit, h)),
        Step::Write {
            unit,
            format,
            values,
            rec,
        } => {
            let program = match compile(format.as_deref()) {
                Ok(p) => p,
                Err(fault) => return Ok(Err(fault)),
            };
            let mut options = runtime.statement(h);
            options.record = *rec;
            let outcome = runtime.write(*unit, program.as_ref(), options, |engine| {
                write_list(engine, values)
            });
            match flatten(outcome) {
                Ok(Completion::Done(Completion::Status(stat))) | Ok(Completion::Status(stat)) => {
                    Ok(step_line("write", stat.code(), None))
                }
                Ok(Completion::Done(Completion::Done(()))) => Ok(step_line("write", 0, None)),
                Err(fault) => Err(fault),
            }
        }
        Step::Read {
            unit,
            format,
            kinds,
            rec,
        } => {
            let kinds = parse_kinds(case, kinds)?;
            let program = match compile(format.as_deref()) {
                Ok(p) => p,
                Err(fault) => return Ok(Err(fault)),
            };
            let mut options = runtime.statement(h);
            options.record = *rec;
            let outcome =
                runtime.read(*unit, program.as_ref(), options, |engine| read_list(engine, &kinds));
            match flatten(outcome) {
                Ok(Completion::Done((values, stat))) => Ok(step_line(
                    "read",
                    stat.map_or(0, IoStat::code),
                    Some(values.join("|")),
                )),
                Ok(Completion::Status(stat)) => Ok(step_line("read", stat.code(), None)),
                Err(fault) => Err(fault),
            }
        }
        Step::Inquire { unit, file } => {
            let report = match (unit, file) {
                (Some(unit), _) => runtime.inquire_unit(*unit),
                (None, Some(file)) => runtime.inquire_file(&within(dir, file)),
                (None, None) => return Err(bad_input(case, "inquire needs a unit or a file")),
            };
            Ok(step_line("inquire", 0, Some(render_inquiry(&report))))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(json: &str) -> FixtureSet {
        FixtureSet::from_json(&format!(
            r#"{{"version":"v1","family":"smoke","captured_at":"2026-10-01T00:00:00Z","cases":[{json}]}}"#
        ))
        .expect("valid fixture json")
    }

    #[test]
    fn formatted_write_case_passes() {
        let set = single(
            r#"{"name":"i5f62","operation":"format_write","section":"edit I/F",
                "inputs":{"format":"(I5,F6.2)","values":[{"integer":42},{"real":3.14}]},
                "expected_output":"   42  3.14"}"#,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "{:?}", results[0].diff);
    }

    #[test]
    fn list_directed_read_stops_at_end_of_file() {
        let set = single(
            r#"{"name":"eof","operation":"format_read","section":"end of file",
                "inputs":{"records":["1 2"],"kinds":["integer","integer","integer"]},
                "expected_output":"1|2","expected_iostat":-1}"#,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert!(results[0].passed, "{:?}", results[0]);
    }

    #[test]
    fn format_error_renders_as_fault() {
        let case: FixtureCase = serde_json::from_value(serde_json::json!({
            "name": "mismatch",
            "operation": "format_write",
            "section": "descriptor mismatch",
            "inputs": {"format": "(I5)", "values": [{"text": "no"}]},
            "expected_output": ""
        }))
        .expect("case");
        let run = execute_case(&case).expect("runs");
        assert!(run.output.starts_with("fault: format error"), "{}", run.output);
    }

    #[test]
    fn lifecycle_open_new_then_old() {
        let case: FixtureCase = serde_json::from_value(serde_json::json!({
            "name": "open",
            "operation": "lifecycle",
            "section": "OPEN status",
            "inputs": {"steps": [
                {"op": "open", "unit": 10, "params": {"file": "a.dat", "status": "new"}},
                {"op": "write", "unit": 10, "values": [{"integer": 5}]},
                {"op": "close", "unit": 10},
                {"op": "open", "unit": 11, "params": {"file": "a.dat", "status": "new"}},
                {"op": "open", "unit": 11, "params": {"file": "a.dat", "status": "old"}},
                {"op": "read", "unit": 11, "kinds": ["integer"]}
            ]},
            "expected_output": ""
        }))
        .expect("case");
        let run = execute_case(&case).expect("runs");
        assert_eq!(
            run.output,
            "open 0\nwrite 0\nclose 0\nopen 2\nopen 0\nread 0 5"
        );
        assert_eq!(run.iostat, 0);
    }

    #[test]
    fn unknown_operation_is_an_error() {
        let case: FixtureCase = serde_json::from_value(serde_json::json!({
            "name": "x", "operation": "seek", "section": "-", "inputs": {}, "expected_output": ""
        }))
        .expect("case");
        assert!(matches!(
            execute_case(&case),
            Err(HarnessError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn kind_names() {
        assert_eq!(parse_kind("Double"), Some(ValueKind::Double));
        assert_eq!(parse_kind("text*8"), Some(ValueKind::FixedText(8)));
        assert_eq!(parse_kind("text*"), None);
        assert_eq!(parse_kind("quad"), None);
    }
}
