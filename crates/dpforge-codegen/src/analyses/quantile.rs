use dpforge_plan::analysis_type;
use dpforge_template::{PyValue, Template};

use crate::analyses::{Analysis, AnalysisRegistry, ColumnConfig};
use crate::errors::Result;
use crate::naming::ColumnNames;

pub fn register(registry: &mut AnalysisRegistry) {
    registry.register_analysis(Box::new(Quantile));
}

/// Quartiles released by one query.
pub const QUANTILES: [f64; 3] = [0.25, 0.5, 0.75];

pub struct Quantile;

impl Analysis for Quantile {
    fn name(&self) -> &'static str {
        analysis_type::QUANTILE
    }

    fn template_prefix(&self) -> &'static str {
        "quantile"
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String> {
        let names = ColumnNames::new(column.name);
        let code = Template::named("quantile_config")?
            .fill_expressions([("CONFIG_NAME", names.config.as_str())])?
            .fill_values([
                ("LOWER_BOUND", PyValue::number(column.lower_bound)),
                ("UPPER_BOUND", PyValue::number(column.upper_bound)),
                ("QUANTILES", PyValue::from(QUANTILES.to_vec())),
            ])?
            .fill_values([("COLUMN_NAME", column.name)])?
            .finish()?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lists_quartiles() {
        let block = Quantile
            .make_column_config_block(&ColumnConfig {
                name: "age",
                lower_bound: 0.0,
                upper_bound: 120.0,
                bin_count: 0,
            })
            .expect("config");
        assert!(block.contains("age_config = ["));
        assert!(block.contains("for quantile in [0.25, 0.5, 0.75]"));
        assert!(block.contains("make_cut_points(0, 120, bin_count=100)"));
    }
}
