use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dpforge_plan::AnalysisPlan;
use dpforge_template::{PyValue, Template};

use crate::analyses::{EmitContext, get_analysis_by_name, make_column_config_block};
use crate::context::make_partial_context;
use crate::errors::{CodegenError, Result};
use crate::format::{Formatter, Passthrough};
use crate::naming::{ColumnNames, check_identifiers, comment_safe};

pub const DEFAULT_DEPENDENCIES: &str = "'opendp[polars]==0.12.1a20250227001' matplotlib pyyaml";

/// Shape of the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    /// Jupytext "light" notebook with cells and a report.
    Notebook,
    /// Command line script taking the data path as `--csv`.
    Script,
}

impl Form {
    pub fn as_str(&self) -> &'static str {
        match self {
            Form::Notebook => "notebook",
            Form::Script => "script",
        }
    }

    /// Catalog entry holding the outer scaffold.
    pub fn root_template(&self) -> &'static str {
        self.as_str()
    }

    fn cell(&self, block: &str) -> String {
        match self {
            Form::Notebook => format!("\n# +\n{block}\n# -\n"),
            Form::Script => block.to_string(),
        }
    }
}

/// Knobs that do not come from the plan itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// pip requirement string for the install line.
    pub dependencies: String,
    pub confidence: f64,
    pub max_partition_length: u64,
    pub max_num_partitions: u64,
    pub delta: f64,
    pub txt_report_path: String,
    pub csv_report_path: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            dependencies: DEFAULT_DEPENDENCIES.to_string(),
            confidence: 0.95,
            max_partition_length: 1_000_000,
            max_num_partitions: 100,
            delta: 1e-7,
            txt_report_path: "report.txt".to_string(),
            csv_report_path: "report.csv".to_string(),
        }
    }
}

/// Lowers an [`AnalysisPlan`] to Python source in one [`Form`].
pub struct CodeGenerator {
    form: Form,
    options: GeneratorOptions,
    formatter: Box<dyn Formatter>,
}

impl CodeGenerator {
    pub fn new(form: Form, options: GeneratorOptions) -> Self {
        Self {
            form,
            options,
            formatter: Box::new(Passthrough),
        }
    }

    pub fn notebook(options: GeneratorOptions) -> Self {
        Self::new(Form::Notebook, options)
    }

    pub fn script(options: GeneratorOptions) -> Self {
        Self::new(Form::Script, options)
    }

    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Full program text for `plan`. Any failure aborts with no output.
    pub fn make_py(&self, plan: &AnalysisPlan) -> Result<String> {
        info!(
            event = "generation_started",
            form = self.form.as_str(),
            columns = plan.columns.len(),
            groups = plan.groups.len()
        );
        check_identifiers(plan.columns.names())?;

        let ctx = EmitContext {
            form: self.form,
            groups: &plan.groups,
            confidence: self.options.confidence,
        };

        let mut blocks = vec![
            ("IMPORTS_BLOCK", Template::named("imports")?.finish()?),
            ("UTILS_BLOCK", Template::named("utils")?.finish()?),
            ("COLUMNS_BLOCK", self.make_columns(plan)?),
            ("CONTEXT_BLOCK", self.make_context(plan)?),
            ("QUERIES_BLOCK", self.make_queries(plan, &ctx)?),
        ];
        if self.form == Form::Notebook {
            blocks.push(("REPORTS_BLOCK", self.make_reports(plan)?));
        }

        let code = Template::named(self.form.root_template())?
            .fill_expressions([("DEPENDENCIES", self.options.dependencies.as_str())])?
            .fill_blocks(blocks)?
            .finish()?;

        let formatted = self
            .formatter
            .format(&code)
            .map_err(|err| CodegenError::Format(err.to_string()))?;
        info!(
            event = "generation_finished",
            form = self.form.as_str(),
            bytes = formatted.len()
        );
        Ok(formatted)
    }

    fn make_columns(&self, plan: &AnalysisPlan) -> Result<String> {
        let mut sections = Vec::with_capacity(plan.columns.len());
        for (name, column) in plan.columns.iter() {
            let block = make_column_config_block(
                name,
                &column.analysis_type,
                column.lower_bound,
                column.upper_bound,
                column.bin_count,
            )?;
            debug!(event = "column_config", column = name, analysis = %column.analysis_type);
            let heading = comment_safe(name);
            sections.push(match self.form {
                Form::Notebook => {
                    format!("# ### Expression for `{heading}`\n{}", self.form.cell(&block))
                }
                Form::Script => format!("# Expression for `{heading}`\n{block}"),
            });
        }
        Ok(sections.join("\n"))
    }

    fn make_context(&self, plan: &AnalysisPlan) -> Result<String> {
        let partial = make_partial_context(plan, &self.options)?;
        let code = match self.form {
            Form::Notebook => {
                let csv_path = plan.csv_path.as_deref().ok_or(CodegenError::MissingCsvPath)?;
                let literal = PyValue::from(csv_path).to_string();
                partial.fill_expressions([("CSV_PATH", literal.as_str())])?
            }
            Form::Script => partial.fill_expressions([("CSV_PATH", "csv_path")])?,
        };
        Ok(code.finish()?)
    }

    fn make_queries(&self, plan: &AnalysisPlan, ctx: &EmitContext<'_>) -> Result<String> {
        let confidence_line = format!(
            "confidence = {} # {}",
            PyValue::Float(self.options.confidence),
            ctx.confidence_note()
        );
        let mut cells = vec![self.form.cell(&confidence_line)];
        for (name, column) in plan.columns.iter() {
            let analysis = get_analysis_by_name(&column.analysis_type)?;
            let names = ColumnNames::new(name);
            let query = analysis.make_query(ctx, &names)?;
            let output = analysis.make_output(ctx, name, &names)?;
            debug!(event = "column_query", column = name, analysis = analysis.name());
            cells.push(self.form.cell(&query) + &self.form.cell(&output));
        }
        Ok(cells.join("\n"))
    }

    fn make_reports(&self, plan: &AnalysisPlan) -> Result<String> {
        let mut outputs = Vec::with_capacity(plan.columns.len());
        let mut columns = Vec::with_capacity(plan.columns.len());
        for (name, column) in plan.columns.iter() {
            let analysis = get_analysis_by_name(&column.analysis_type)?;
            outputs.push(analysis.make_report_kv(
                name,
                self.options.confidence,
                &ColumnNames::new(name),
            )?);
            columns.push((
                PyValue::from(name),
                PyValue::Dict(vec![
                    (
                        PyValue::from("analysis_type"),
                        PyValue::from(&column.analysis_type),
                    ),
                    (
                        PyValue::from("lower_bound"),
                        PyValue::number(column.lower_bound),
                    ),
                    (
                        PyValue::from("upper_bound"),
                        PyValue::number(column.upper_bound),
                    ),
                    (PyValue::from("bin_count"), PyValue::from(column.bin_count)),
                    (PyValue::from("weight"), PyValue::from(column.weight)),
                ]),
            ));
        }

        let outputs = format!("{{{}}}", outputs.join(","));
        let columns = PyValue::Dict(columns).to_string();
        let code = Template::named("reports")?
            .fill_values([
                ("EPSILON", PyValue::number(plan.epsilon)),
                ("TXT_REPORT_PATH", PyValue::from(&self.options.txt_report_path)),
                ("CSV_REPORT_PATH", PyValue::from(&self.options.csv_report_path)),
                ("CSV_PATH", PyValue::from(plan.csv_path.as_deref())),
            ])?
            .fill_expressions([("OUTPUTS", outputs.as_str()), ("COLUMNS", columns.as_str())])?
            .finish()?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notebook_cells_are_delimited() {
        assert_eq!(Form::Notebook.cell("x = 1"), "\n# +\nx = 1\n# -\n");
        assert_eq!(Form::Script.cell("x = 1"), "x = 1");
    }

    #[test]
    fn generator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodeGenerator>();
    }

    #[test]
    fn default_options() {
        let options = GeneratorOptions::default();
        assert_eq!(options.confidence, 0.95);
        assert_eq!(options.max_partition_length, 1_000_000);
        assert_eq!(options.max_num_partitions, 100);
        assert_eq!(options.delta, 1e-7);
        assert_eq!(options.txt_report_path, "report.txt");
    }

    #[test]
    fn partial_options_keep_defaults() {
        let options: GeneratorOptions =
            serde_json::from_str(r#"{"confidence": 0.9}"#).expect("options");
        assert_eq!(options.confidence, 0.9);
        assert_eq!(options.max_num_partitions, 100);
        assert_eq!(options.dependencies, DEFAULT_DEPENDENCIES);
    }
}
