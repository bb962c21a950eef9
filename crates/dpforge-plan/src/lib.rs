//! Analysis plan contract: data model, wire formats, JSON Schema and
//! input validation.
//!
//! The code generator trusts a plan as given. Everything in `validate` exists
//! to catch user mistakes before a plan gets that far.

pub mod errors;
pub mod load;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
pub use load::{PlanFormat, load_plan, parse_plan, plan_document};
pub use model::{
    AnalysisPlan, AnalysisPlanBuilder, AnalysisPlanColumn, PlanColumns, analysis_type,
};
pub use schema::{plan_json_schema, plan_schema_value};
pub use validate::{ValidatedPlan, validate_plan, validate_plan_json, validate_plan_text};
