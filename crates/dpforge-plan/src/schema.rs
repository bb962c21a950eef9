use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;

use crate::errors::Result;
use crate::model::AnalysisPlan;

/// Emit the JSON Schema for plan documents.
pub fn plan_json_schema() -> RootSchema {
    schema_for!(AnalysisPlan)
}

/// The plan schema as a JSON value, ready to compile.
pub fn plan_schema_value() -> Result<Value> {
    Ok(serde_json::to_value(plan_json_schema())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_core_fields() {
        let schema = plan_schema_value().expect("schema");
        let required = schema["required"].as_array().expect("required list");
        for field in ["contributions", "epsilon", "columns"] {
            assert!(required.iter().any(|value| value == field), "{field}");
        }
        assert!(!required.iter().any(|value| value == "csv_path"));
    }
}
