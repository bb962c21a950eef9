use thiserror::Error;

use dpforge_template::TemplateError;

/// Errors emitted while generating code from a plan.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Unrecognized analysis: '{name}'")]
    UnrecognizedAnalysis { name: String },
    #[error("columns '{first}' and '{second}' both generate the Python name '{variable}'")]
    IdentifierCollision {
        first: String,
        second: String,
        variable: String,
    },
    #[error("notebook generation requires a csv_path")]
    MissingCsvPath,
    #[error("formatter failed: {0}")]
    Format(String),
}

/// Result type for code generation.
pub type Result<T> = std::result::Result<T, CodegenError>;
