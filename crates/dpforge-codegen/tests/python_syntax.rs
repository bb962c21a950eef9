//! Generated programs checked by a real Python interpreter. Skipped when
//! `python3` is not on the PATH.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use dpforge_codegen::{CodeGenerator, GeneratorOptions};
use dpforge_plan::{AnalysisPlan, AnalysisPlanColumn, analysis_type};

const PARSE: &str = "import ast, sys; ast.parse(sys.stdin.read())";

/// True when the pinned OpenDP release and the other imports are installed.
const HAS_STACK: &str = "\
import importlib.metadata, polars, matplotlib
assert importlib.metadata.version('opendp') == '0.12.1a20250227001'
import opendp.prelude
";

fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn python(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new("python3")
        .args(args)
        .env("MPLBACKEND", "Agg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn python3");
    let mut pipe = child.stdin.take().expect("stdin");
    if let Err(err) = pipe.write_all(stdin.as_bytes())
        && err.kind() != ErrorKind::BrokenPipe
    {
        panic!("write to python3: {err}");
    }
    drop(pipe);
    child.wait_with_output().expect("python3 output")
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fake.csv")
}

fn all_kinds_plan() -> AnalysisPlan {
    let csv = fixture();
    AnalysisPlan::builder(1, 6.0)
        .csv_path(csv.to_string_lossy())
        .group("class_year")
        .column("hw_number", AnalysisPlanColumn::histogram(0.0, 10.0, 5))
        .column(
            "grade",
            AnalysisPlanColumn::new(analysis_type::MEAN, 0.0, 100.0, 0, 1),
        )
        .column(
            "age",
            AnalysisPlanColumn::new(analysis_type::MEDIAN, 0.0, 100.0, 0, 1),
        )
        .column(
            "score",
            AnalysisPlanColumn::new(analysis_type::QUANTILE, 0.0, 100.0, 0, 1),
        )
        .column(
            "attendance",
            AnalysisPlanColumn::new(analysis_type::COUNT, 0.0, 1.0, 0, 1),
        )
        .column(
            "height",
            AnalysisPlanColumn::new(analysis_type::STANDARD_DEVIATION, 100.0, 250.0, 0, 1),
        )
        .build()
}

#[test]
fn every_form_parses_as_python() {
    if !python_available() {
        eprintln!("python3 not found; skipping");
        return;
    }
    let plan = all_kinds_plan();
    for generator in [
        CodeGenerator::notebook(GeneratorOptions::default()),
        CodeGenerator::script(GeneratorOptions::default()),
    ] {
        let code = generator.make_py(&plan).expect("generate");
        let output = python(&["-c", PARSE], &code);
        assert!(
            output.status.success(),
            "{:?} form is not valid Python:\n{}\n{code}",
            generator.form(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn script_runs_against_fixture() {
    if !python_available() || !python(&["-"], HAS_STACK).status.success() {
        eprintln!("python3 with polars and opendp not found; skipping");
        return;
    }
    let code = CodeGenerator::script(GeneratorOptions::default())
        .make_py(&all_kinds_plan())
        .expect("script");

    let dir = std::env::temp_dir().join(format!("dpforge-script-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let script = dir.join("script.py");
    std::fs::write(&script, &code).expect("write script");

    let script_arg = script.to_string_lossy();
    let csv = fixture();
    let csv_arg = csv.to_string_lossy();
    let output = python(&[script_arg.as_ref(), "--csv", csv_arg.as_ref()], "");
    std::fs::remove_dir_all(&dir).ok();

    assert!(
        output.status.success(),
        "script failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}
