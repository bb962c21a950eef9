use std::collections::HashSet;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
use crate::load::{PlanFormat, parse_plan, plan_document};
use crate::model::{AnalysisPlan, AnalysisPlanColumn, analysis_type};
use crate::schema::plan_schema_value;

/// Plan that passed validation, with any warnings raised along the way.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: AnalysisPlan,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a plan document against the plan JSON Schema.
pub fn validate_plan_json(
    plan_json: &Value,
    plan_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Checks that the structure alone cannot express: positive budget, sane
/// bounds, known statistics and consistent grouping.
pub fn validate_plan(plan: &AnalysisPlan) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_budget(plan, &mut report);
    validate_columns(plan, &mut report);
    validate_groups(plan, &mut report);

    if plan.csv_path.is_none() {
        report.push_warning(
            ValidationIssue::warning(
                "csv_path_missing",
                "/csv_path",
                "plan has no csv_path; only the script form can be generated",
            )
            .with_hint("set csv_path to generate a notebook"),
        );
    }

    report
}

/// Structural then semantic validation of a plan file's text.
pub fn validate_plan_text(
    text: &str,
    format: PlanFormat,
) -> Result<ValidatedPlan, ValidationReport> {
    let structural = plan_document(text, format)
        .and_then(|document| validate_plan_json(&document, &plan_schema_value()?));
    let structural = match structural {
        Ok(report) => report,
        Err(err) => return Err(single_error("invalid_plan_document", err.to_string())),
    };
    if !structural.is_ok() {
        return Err(structural);
    }

    let plan = match parse_plan(text, format) {
        Ok(plan) => plan,
        Err(err) => return Err(single_error("invalid_plan", err.to_string())),
    };

    let report = validate_plan(&plan);
    if !report.is_ok() {
        return Err(report);
    }

    Ok(ValidatedPlan {
        plan,
        warnings: report.warnings,
    })
}

fn single_error(code: &str, message: String) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push_error(ValidationIssue::error(code, "/", message));
    report
}

fn validate_budget(plan: &AnalysisPlan, report: &mut ValidationReport) {
    if !(plan.epsilon.is_finite() && plan.epsilon > 0.0) {
        report.push_error(
            ValidationIssue::error(
                "epsilon_not_positive",
                "/epsilon",
                format!("epsilon must be a positive number, got {}", plan.epsilon),
            )
            .with_hint("typical values are between 0.1 and 10"),
        );
    }

    if plan.contributions == 0 {
        report.push_error(
            ValidationIssue::error(
                "contributions_zero",
                "/contributions",
                "contributions must be greater than zero",
            )
            .with_hint("set contributions to the most rows one individual can add"),
        );
    }
}

fn validate_columns(plan: &AnalysisPlan, report: &mut ValidationReport) {
    if plan.columns.is_empty() {
        report.push_error(
            ValidationIssue::error("no_columns", "/columns", "plan has no columns to analyze")
                .with_hint("add at least one column"),
        );
        return;
    }

    for (name, column) in plan.columns.iter() {
        let base_path = format!("/columns/{}", escape_pointer(name));
        validate_column(name, column, &base_path, report);
    }
}

fn validate_column(
    name: &str,
    column: &AnalysisPlanColumn,
    base_path: &str,
    report: &mut ValidationReport,
) {
    if !analysis_type::is_known(&column.analysis_type) {
        report.push_error(
            ValidationIssue::error(
                "unknown_analysis_type",
                format!("{base_path}/analysis_type"),
                format!(
                    "column '{name}' has unknown analysis_type '{}'",
                    column.analysis_type
                ),
            )
            .with_hint(format!("use one of: {}", analysis_type::ALL.join(", "))),
        );
    }

    let bounds_ok = column.lower_bound.is_finite()
        && column.upper_bound.is_finite()
        && column.lower_bound < column.upper_bound;
    if !bounds_ok {
        report.push_error(ValidationIssue::error(
            "invalid_bounds",
            format!("{base_path}/lower_bound"),
            format!(
                "column '{name}' needs lower_bound < upper_bound, got {} and {}",
                column.lower_bound, column.upper_bound
            ),
        ));
    }

    if column.analysis_type == analysis_type::HISTOGRAM && column.bin_count == 0 {
        report.push_error(ValidationIssue::error(
            "bin_count_zero",
            format!("{base_path}/bin_count"),
            format!("histogram column '{name}' needs at least one bin"),
        ));
    }

    if column.weight == 0 {
        report.push_error(
            ValidationIssue::error(
                "weight_zero",
                format!("{base_path}/weight"),
                format!("column '{name}' has zero weight"),
            )
            .with_hint("remove the column instead of giving it no budget"),
        );
    }
}

fn validate_groups(plan: &AnalysisPlan, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (idx, group) in plan.groups.iter().enumerate() {
        let path = format!("/groups/{idx}");
        if plan.columns.contains(group) {
            report.push_error(ValidationIssue::error(
                "group_is_column",
                path.clone(),
                format!("'{group}' is used both as a group and as an analyzed column"),
            ));
        }
        if !seen.insert(group.as_str()) {
            report.push_error(ValidationIssue::error(
                "duplicate_group",
                path,
                format!("group '{group}' is listed more than once"),
            ));
        }
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_segments_are_escaped() {
        assert_eq!(escape_pointer("a/b~c"), "a~1b~0c");
        assert_eq!(normalized_json_pointer(""), "/");
    }
}
