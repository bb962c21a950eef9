use dpforge_plan::analysis_type;
use dpforge_template::{PyValue, Template};

use crate::analyses::{Analysis, AnalysisRegistry, ColumnConfig, EmitContext};
use crate::errors::Result;
use crate::generator::Form;
use crate::naming::ColumnNames;

pub fn register(registry: &mut AnalysisRegistry) {
    registry.register_analysis(Box::new(Histogram));
}

/// Noisy counts per bin, with the bin column added to the data as a margin.
pub struct Histogram;

impl Analysis for Histogram {
    fn name(&self) -> &'static str {
        analysis_type::HISTOGRAM
    }

    fn template_prefix(&self) -> &'static str {
        "histogram"
    }

    fn has_bins(&self) -> bool {
        true
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String> {
        let names = ColumnNames::new(column.name);
        let code = Template::named("histogram_config")?
            .fill_expressions([
                ("CUT_LIST_NAME", names.cut_points.as_str()),
                ("CONFIG_NAME", names.config.as_str()),
            ])?
            .fill_values([
                ("LOWER_BOUND", PyValue::number(column.lower_bound)),
                ("UPPER_BOUND", PyValue::number(column.upper_bound)),
                ("BIN_COUNT", PyValue::from(column.bin_count)),
                ("BIN_COLUMN_NAME", PyValue::from(&names.bin)),
            ])?
            .fill_values([("COLUMN_NAME", column.name)])?
            .finish()?;
        Ok(code)
    }

    fn make_query(&self, ctx: &EmitContext<'_>, names: &ColumnNames) -> Result<String> {
        let code = Template::named("histogram_query")?
            .fill_expressions([
                ("QUERY_NAME", names.query.as_str()),
                ("ACCURACY_NAME", names.accuracy.as_str()),
                ("STATS_NAME", names.stats.as_str()),
            ])?
            .fill_values([
                ("BIN_NAME", PyValue::from(&names.bin)),
                ("GROUP_NAMES", ctx.group_names()),
            ])?
            .finish()?;
        Ok(code)
    }

    fn make_output(
        &self,
        ctx: &EmitContext<'_>,
        column_name: &str,
        names: &ColumnNames,
    ) -> Result<String> {
        let note = ctx.confidence_note();
        let template = Template::named(&format!("histogram_{}_output", ctx.form.as_str()))?
            .fill_expressions([
                ("CONFIDENCE_NOTE", note.as_str()),
                ("ACCURACY_NAME", names.accuracy.as_str()),
                ("STATS_NAME", names.stats.as_str()),
            ])?;
        let template = match ctx.form {
            Form::Notebook => template.fill_values([
                ("GROUP_NAMES", ctx.group_names()),
                ("COLUMN_NAME", PyValue::from(column_name)),
            ])?,
            Form::Script => template.fill_values([("COLUMN_NAME", column_name)])?,
        };
        Ok(template.finish()?)
    }

    fn make_report_kv(
        &self,
        column_name: &str,
        confidence: f64,
        names: &ColumnNames,
    ) -> Result<String> {
        let code = Template::named("histogram_report_kv")?
            .fill_expressions([
                ("ACCURACY_NAME", names.accuracy.as_str()),
                ("STATS_NAME", names.stats.as_str()),
            ])?
            .fill_values([
                ("CONFIDENCE", PyValue::Float(confidence)),
                ("COLUMN_NAME", PyValue::from(column_name)),
            ])?
            .finish()?;
        Ok(code.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_groups_by_bin_then_plan_groups() {
        let groups = vec!["class_year".to_string()];
        let ctx = EmitContext {
            form: Form::Notebook,
            groups: &groups,
            confidence: 0.95,
        };
        let query = Histogram
            .make_query(&ctx, &ColumnNames::new("HW Number"))
            .expect("query");
        assert!(query.starts_with("groups = ['hw_number_bin'] + ['class_year']\n"));
        assert!(query.contains("hw_number_accuracy = hw_number_query.summarize("));
        assert!(query.contains(".sort('hw_number_bin')"));
    }

    #[test]
    fn report_kv_has_no_trailing_newline() {
        let kv = Histogram
            .make_report_kv("HW GRADE", 0.95, &ColumnNames::new("HW GRADE"))
            .expect("report kv");
        assert!(kv.starts_with("'HW GRADE': {"));
        assert!(kv.contains("\"confidence\": 0.95,"));
        assert!(kv.ends_with('}'));
    }
}
