mod formatter;
mod registry;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dpforge_codegen::{CodeGenerator, CodegenError, Form, GeneratorOptions, check_identifiers};
use dpforge_plan::{
    AnalysisPlan, PlanError, PlanFormat, ValidationIssue, plan_schema_value, validate_plan_text,
};
use formatter::CommandFormatter;
use registry::{RunContext, init_logging, start_run, write_bytes_atomic, write_plan, write_program};
use settings::{DEFAULT_SETTINGS_PATH, FormatterSettings, Settings, load_settings};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("settings error: {0}")]
    Settings(#[from] settings::SettingsError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("codegen error: {0}")]
    Codegen(#[from] CodegenError),
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "dpforge", version, about = "Generate OpenDP programs from analysis plans")]
struct Cli {
    /// Settings file.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the notebook and/or script for a plan.
    Generate(GenerateArgs),
    /// Check a plan without generating anything.
    Validate(ValidateArgs),
    /// Print the plan JSON Schema.
    Schema(SchemaArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormArg {
    Notebook,
    Script,
    Both,
}

impl FormArg {
    fn forms(self) -> Vec<Form> {
        match self {
            FormArg::Notebook => vec![Form::Notebook],
            FormArg::Script => vec![Form::Script],
            FormArg::Both => vec![Form::Notebook, Form::Script],
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Plan file (.json or .toml).
    plan: PathBuf,
    /// Which program(s) to generate.
    #[arg(long, value_enum, default_value_t = FormArg::Both)]
    form: FormArg,
    /// Output directory for runs (overrides settings).
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Also write the generated files into this directory.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Data file for the notebook (overrides the plan's csv_path).
    #[arg(long)]
    csv_path: Option<String>,
    /// Confidence level for accuracy estimates (overrides settings).
    #[arg(long)]
    confidence: Option<f64>,
    /// Run black over the output even without a [formatter] table.
    #[arg(long, conflicts_with = "no_format")]
    format: bool,
    /// Skip the configured formatter.
    #[arg(long)]
    no_format: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Plan file (.json or .toml).
    plan: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;

    match cli.command {
        Command::Generate(args) => run_generate(args, settings),
        Command::Validate(args) => run_validate(args),
        Command::Schema(args) => run_schema(args),
    }
}

fn run_generate(args: GenerateArgs, settings: Settings) -> Result<(), CliError> {
    let GenerateArgs {
        plan: plan_source,
        form,
        run_dir,
        out,
        csv_path,
        confidence,
        format,
        no_format,
    } = args;

    let (mut plan, warnings) = read_plan(&plan_source)?;
    if let Some(csv_path) = csv_path {
        plan = plan.to_builder().csv_path(csv_path).build();
    }

    let mut options = settings.generator_options();
    if let Some(confidence) = confidence {
        options.confidence = confidence;
    }
    validate_options(&options)?;

    let formatter = match (no_format, format, settings.formatter) {
        (true, _, _) => None,
        (false, _, Some(configured)) => Some(configured),
        (false, true, None) => Some(FormatterSettings::default()),
        (false, false, None) => None,
    };

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: run_dir.unwrap_or(settings.run_dir),
        plan_source: plan_source.clone(),
        forms: form.forms(),
        options,
        formatter,
    };

    let run_paths = start_run(&run_ctx)?;
    init_logging(Some(&run_paths.logs_path))?;

    tracing::info!(event = "run_started", run_id = %run_id, plan = %plan_source.display());
    for warning in &warnings {
        tracing::warn!(event = "plan_warning", code = %warning.code, path = %warning.path, message = %warning.message);
    }

    let timer = Instant::now();

    write_plan(&run_paths, &plan)?;
    tracing::info!(event = "plan_written", path = %run_paths.plan_path.display());

    for form in &run_ctx.forms {
        let generator = make_generator(*form, &run_ctx);
        let code = generator.make_py(&plan)?;
        let path = write_program(&run_paths, *form, &code, out.as_deref())?;
        tracing::info!(event = "program_written", form = form.as_str(), path = %path.display());
        println!("{}", path.display());
    }

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);

    Ok(())
}

/// Checks the options after settings and flags are merged.
fn validate_options(options: &GeneratorOptions) -> Result<(), CliError> {
    if !(options.confidence > 0.0 && options.confidence < 1.0) {
        return Err(CliError::InvalidConfig(format!(
            "confidence must be between 0 and 1, got {}",
            options.confidence
        )));
    }
    if !(options.delta >= 0.0 && options.delta < 1.0) {
        return Err(CliError::InvalidConfig(format!(
            "delta must be in [0, 1), got {}",
            options.delta
        )));
    }
    Ok(())
}

fn make_generator(form: Form, run_ctx: &RunContext) -> CodeGenerator {
    let generator = CodeGenerator::new(form, run_ctx.options.clone());
    match &run_ctx.formatter {
        Some(settings) => generator.with_formatter(CommandFormatter::new(settings)),
        None => generator,
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let (plan, warnings) = read_plan(&args.plan)?;
    for warning in &warnings {
        eprintln!("{}", describe(warning));
    }
    println!(
        "{}: ok ({} columns, {} groups)",
        args.plan.display(),
        plan.columns.len(),
        plan.groups.len()
    );
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let schema = plan_schema_value()?;
    let mut text = serde_json::to_string_pretty(&schema).map_err(PlanError::from)?;
    text.push('\n');

    match args.out {
        Some(path) => {
            write_bytes_atomic(&path, text.as_bytes())?;
            tracing::info!(event = "schema_written", path = %path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Structurally and semantically validated plan, with its warnings.
fn read_plan(path: &Path) -> Result<(AnalysisPlan, Vec<ValidationIssue>), CliError> {
    let text = std::fs::read_to_string(path).map_err(PlanError::from)?;
    match validate_plan_text(&text, PlanFormat::from_path(path)) {
        Ok(validated) => {
            check_identifiers(validated.plan.columns.names())?;
            Ok((validated.plan, validated.warnings))
        }
        Err(report) => {
            for issue in report.errors.iter().chain(&report.warnings) {
                eprintln!("{}", describe(issue));
            }
            Err(CliError::InvalidPlan(report.summary()))
        }
    }
}

fn describe(issue: &ValidationIssue) -> String {
    match &issue.hint {
        Some(hint) => format!("{issue} (hint: {hint})"),
        None => issue.to_string(),
    }
}
