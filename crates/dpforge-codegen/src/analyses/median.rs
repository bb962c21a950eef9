use dpforge_plan::analysis_type;

use crate::analyses::{Analysis, AnalysisRegistry, ColumnConfig, bounded_config_block};
use crate::errors::Result;

pub fn register(registry: &mut AnalysisRegistry) {
    registry.register_analysis(Box::new(Median));
}

/// The 0.5 quantile, searched over 100 evenly spaced candidates.
pub struct Median;

impl Analysis for Median {
    fn name(&self) -> &'static str {
        analysis_type::MEDIAN
    }

    fn template_prefix(&self) -> &'static str {
        "median"
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String> {
        bounded_config_block("median_config", column)
    }
}
