use dpforge_plan::analysis_type;
use dpforge_template::{PyValue, Template};

use crate::analyses::{Analysis, AnalysisRegistry, ColumnConfig};
use crate::errors::Result;
use crate::naming::ColumnNames;

pub fn register(registry: &mut AnalysisRegistry) {
    registry.register_analysis(Box::new(StandardDeviation));
}

/// Derived from a private mean and a private mean of squares:
/// `sqrt(max(E[x^2] - E[x]^2, 0))`.
pub struct StandardDeviation;

impl Analysis for StandardDeviation {
    fn name(&self) -> &'static str {
        analysis_type::STANDARD_DEVIATION
    }

    fn template_prefix(&self) -> &'static str {
        "stdeviation"
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String> {
        let names = ColumnNames::new(column.name);
        let (square_lower, square_upper) = square_bounds(column.lower_bound, column.upper_bound);
        let code = Template::named("stdeviation_config")?
            .fill_expressions([("CONFIG_NAME", names.config.as_str())])?
            .fill_values([
                ("LOWER_BOUND", PyValue::number(column.lower_bound)),
                ("UPPER_BOUND", PyValue::number(column.upper_bound)),
                ("SQUARE_LOWER_BOUND", PyValue::number(square_lower)),
                ("SQUARE_UPPER_BOUND", PyValue::number(square_upper)),
            ])?
            .fill_values([("COLUMN_NAME", column.name)])?
            .finish()?;
        Ok(code)
    }
}

/// Range of `x^2` for `x` in `[lower, upper]`.
pub fn square_bounds(lower: f64, upper: f64) -> (f64, f64) {
    let (low_square, high_square) = (lower * lower, upper * upper);
    let top = low_square.max(high_square);
    if lower <= 0.0 && upper >= 0.0 {
        (0.0, top)
    } else {
        (low_square.min(high_square), top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_bounds_cover_sign_changes() {
        assert_eq!(square_bounds(0.0, 10.0), (0.0, 100.0));
        assert_eq!(square_bounds(-3.0, 2.0), (0.0, 9.0));
        assert_eq!(square_bounds(2.0, 5.0), (4.0, 25.0));
        assert_eq!(square_bounds(-5.0, -2.0), (4.0, 25.0));
    }

    #[test]
    fn config_releases_both_moments() {
        let block = StandardDeviation
            .make_column_config_block(&ColumnConfig {
                name: "grade",
                lower_bound: 0.0,
                upper_bound: 100.0,
                bin_count: 0,
            })
            .expect("config");
        assert!(block.contains(".dp.mean((0, 100))"));
        assert!(block.contains(".dp.mean((0, 10000))"));
        assert!(block.contains(".alias(\"mean_of_squares\")"));
    }
}
