use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::errors::Result;
use crate::model::AnalysisPlan;

/// Plan file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Toml,
}

impl PlanFormat {
    /// `.toml` files are TOML, anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => PlanFormat::Toml,
            _ => PlanFormat::Json,
        }
    }
}

/// Parse a plan straight from text so column order is kept.
pub fn parse_plan(text: &str, format: PlanFormat) -> Result<AnalysisPlan> {
    let plan = match format {
        PlanFormat::Json => serde_json::from_str(text)?,
        PlanFormat::Toml => toml::from_str(text)?,
    };
    Ok(plan)
}

/// Untyped view of a plan document, for structural validation.
pub fn plan_document(text: &str, format: PlanFormat) -> Result<Value> {
    let value = match format {
        PlanFormat::Json => serde_json::from_str(text)?,
        PlanFormat::Toml => toml::from_str(text)?,
    };
    Ok(value)
}

pub fn load_plan(path: &Path) -> Result<AnalysisPlan> {
    let text = fs::read_to_string(path)?;
    parse_plan(&text, PlanFormat::from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(PlanFormat::from_path(Path::new("plan.toml")), PlanFormat::Toml);
        assert_eq!(PlanFormat::from_path(Path::new("plan.TOML")), PlanFormat::Toml);
        assert_eq!(PlanFormat::from_path(Path::new("plan.json")), PlanFormat::Json);
        assert_eq!(PlanFormat::from_path(Path::new("plan")), PlanFormat::Json);
    }

    #[test]
    fn toml_plan_keeps_column_order() {
        let text = r#"
contributions = 1
epsilon = 1.0

[columns.zeta]
analysis_type = "Mean"
lower_bound = 0.0
upper_bound = 1.0

[columns.alpha]
analysis_type = "Count"
lower_bound = 0.0
upper_bound = 1.0
"#;
        let plan = parse_plan(text, PlanFormat::Toml).expect("parse toml");
        let names: Vec<&str> = plan.columns.names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
