//! Lowers a validated analysis plan into a runnable OpenDP program.
//!
//! Two shapes are produced from the same plan: a Jupytext notebook that also
//! writes a report, and a script taking the data path on the command line.
//! Generation is pure; the only side effect is the optional [`Formatter`].

pub mod analyses;
pub mod context;
pub mod errors;
pub mod format;
pub mod generator;
pub mod naming;

pub use analyses::{
    Analysis, AnalysisRegistry, ColumnConfig, EmitContext, get_analysis_by_name,
    make_column_config_block, make_output, make_query, make_report_kv,
};
pub use context::{make_margins_list, make_privacy_loss_block, make_privacy_unit_block};
pub use errors::{CodegenError, Result};
pub use format::{FormatError, Formatter, Passthrough};
pub use generator::{CodeGenerator, DEFAULT_DEPENDENCIES, Form, GeneratorOptions};
pub use naming::{ColumnNames, check_identifiers, name_to_identifier};
