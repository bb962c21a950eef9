use std::env;
use std::path::PathBuf;

use dpforge_plan::{PlanFormat, ValidationReport, validate_plan_text};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let plan_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("missing plan path")?;
    let text = std::fs::read_to_string(&plan_path)?;

    let validated = match validate_plan_text(&text, PlanFormat::from_path(&plan_path)) {
        Ok(validated) => validated,
        Err(report) => {
            eprintln!("plan validation failed");
            print_report(&report);
            std::process::exit(1);
        }
    };

    if !validated.warnings.is_empty() {
        eprintln!("plan validated with warnings:");
        print_report(&ValidationReport {
            errors: Vec::new(),
            warnings: validated.warnings,
        });
    } else {
        println!(
            "plan validated successfully ({} columns)",
            validated.plan.columns.len()
        );
    }

    Ok(())
}

fn print_report(report: &ValidationReport) {
    for issue in report.errors.iter().chain(&report.warnings) {
        eprintln!("{issue}");
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
}
