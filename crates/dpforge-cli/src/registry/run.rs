use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use dpforge_codegen::{Form, GeneratorOptions};
use dpforge_plan::AnalysisPlan;

use super::RegistryResult;
use super::atomic::{write_bytes_atomic, write_json_atomic};
use crate::settings::FormatterSettings;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub plan_source: PathBuf,
    pub forms: Vec<Form>,
    pub options: GeneratorOptions,
    pub formatter: Option<FormatterSettings>,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub plan_source: String,
    pub forms: Vec<Form>,
    pub options: GeneratorOptions,
    pub formatter: Option<FormatterSettings>,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub plan_path: PathBuf,
    pub logs_path: PathBuf,
}

impl RunPaths {
    fn new(root: PathBuf) -> Self {
        Self {
            config_path: root.join("config.json"),
            plan_path: root.join("plan.json"),
            logs_path: root.join("logs.ndjson"),
            root,
        }
    }

    /// `notebook.py` or `script.py` inside the run directory.
    pub fn program_path(&self, form: Form) -> PathBuf {
        self.root.join(program_file_name(form))
    }
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let run_root = ctx
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&run_root)?;
    let paths = RunPaths::new(run_root);

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        plan_source: ctx.plan_source.display().to_string(),
        forms: ctx.forms.clone(),
        options: ctx.options.clone(),
        formatter: ctx.formatter.clone(),
        git: collect_git_info(),
    };

    write_json_atomic(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

pub fn write_plan(paths: &RunPaths, plan: &AnalysisPlan) -> RegistryResult<()> {
    write_json_atomic(&paths.plan_path, plan)
}

/// Store a generated program in the run, and in `out_dir` when given.
pub fn write_program(
    paths: &RunPaths,
    form: Form,
    code: &str,
    out_dir: Option<&Path>,
) -> RegistryResult<PathBuf> {
    let run_path = paths.program_path(form);
    write_bytes_atomic(&run_path, code.as_bytes())?;

    if let Some(out_dir) = out_dir {
        let out_path = out_dir.join(program_file_name(form));
        write_bytes_atomic(&out_path, code.as_bytes())?;
        return Ok(out_path);
    }

    Ok(run_path)
}

fn program_file_name(form: Form) -> String {
    format!("{}.py", form.as_str())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn context(run_dir: PathBuf) -> RunContext {
        RunContext {
            run_id: "0000-test".to_string(),
            started_at: Utc
                .with_ymd_and_hms(2025, 3, 1, 12, 30, 5)
                .single()
                .expect("valid timestamp"),
            run_dir,
            plan_source: PathBuf::from("plans/grades.plan.json"),
            forms: vec![Form::Notebook, Form::Script],
            options: GeneratorOptions::default(),
            formatter: None,
        }
    }

    #[test]
    fn run_directory_layout() {
        let run_dir =
            std::env::temp_dir().join(format!("dpforge-run-{}", std::process::id()));
        let paths = start_run(&context(run_dir.clone())).expect("start run");

        assert_eq!(
            paths.root,
            run_dir.join("2025-03-01T12-30-05Z__run_0000-test")
        );
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&paths.config_path).expect("config.json"),
        )
        .expect("config is json");
        assert_eq!(config["run_id"], "0000-test");
        assert_eq!(config["forms"], serde_json::json!(["notebook", "script"]));
        assert_eq!(config["options"]["confidence"], 0.95);

        let written = write_program(&paths, Form::Script, "print(1)\n", None).expect("write");
        assert_eq!(written, paths.root.join("script.py"));
        assert_eq!(std::fs::read_to_string(written).expect("read"), "print(1)\n");

        let _ = std::fs::remove_dir_all(&run_dir);
    }
}
