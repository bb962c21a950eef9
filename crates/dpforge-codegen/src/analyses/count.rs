use dpforge_plan::analysis_type;
use dpforge_template::Template;

use crate::analyses::{Analysis, AnalysisRegistry, ColumnConfig};
use crate::errors::Result;
use crate::naming::ColumnNames;

pub fn register(registry: &mut AnalysisRegistry) {
    registry.register_analysis(Box::new(Count));
}

/// Noisy count of non-null values. Bounds are not used.
pub struct Count;

impl Analysis for Count {
    fn name(&self) -> &'static str {
        analysis_type::COUNT
    }

    fn template_prefix(&self) -> &'static str {
        "count"
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String> {
        let names = ColumnNames::new(column.name);
        let code = Template::named("count_config")?
            .fill_expressions([("CONFIG_NAME", names.config.as_str())])?
            .fill_values([("COLUMN_NAME", column.name)])?
            .finish()?;
        Ok(code)
    }
}
