use dpforge_plan::analysis_type;

use crate::analyses::{Analysis, AnalysisRegistry, ColumnConfig, bounded_config_block};
use crate::errors::Result;

pub fn register(registry: &mut AnalysisRegistry) {
    registry.register_analysis(Box::new(Mean));
}

pub struct Mean;

impl Analysis for Mean {
    fn name(&self) -> &'static str {
        analysis_type::MEAN
    }

    fn template_prefix(&self) -> &'static str {
        "mean"
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String> {
        bounded_config_block("mean_config", column)
    }
}
