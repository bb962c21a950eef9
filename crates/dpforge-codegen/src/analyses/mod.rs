//! One emitter per statistic kind, looked up by the plan's `analysis_type`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use dpforge_template::{PyValue, Template};

use crate::errors::{CodegenError, Result};
use crate::generator::Form;
use crate::naming::ColumnNames;

pub mod count;
pub mod histogram;
pub mod mean;
pub mod median;
pub mod quantile;
pub mod stdeviation;

/// Public parameters of one column, as needed by its config block.
#[derive(Debug, Clone, Copy)]
pub struct ColumnConfig<'a> {
    pub name: &'a str,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub bin_count: u32,
}

/// What the analyses need to know about the program being generated.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub form: Form,
    pub groups: &'a [String],
    pub confidence: f64,
}

impl EmitContext<'_> {
    /// Human readable confidence level. Scripts get it as a string literal.
    pub fn confidence_note(&self) -> String {
        // Whole percent, truncated: 0.999 is a 99% interval, never 100%.
        let percent = (self.confidence * 100.0).trunc() as i64;
        let note = format!("{percent}% confidence interval");
        match self.form {
            Form::Notebook => note,
            Form::Script => PyValue::from(note).to_string(),
        }
    }

    pub fn group_names(&self) -> PyValue {
        PyValue::from(self.groups)
    }
}

/// Emitter for one statistic kind.
///
/// The provided methods cover kinds whose release is a single grouped query
/// with no accuracy estimate; binned kinds override them.
pub trait Analysis: Send + Sync {
    /// Name used in `analysis_type`.
    fn name(&self) -> &'static str;

    /// Prefix of this kind's catalog entries.
    fn template_prefix(&self) -> &'static str;

    fn has_bins(&self) -> bool {
        false
    }

    fn make_column_config_block(&self, column: &ColumnConfig<'_>) -> Result<String>;

    fn make_query(&self, ctx: &EmitContext<'_>, names: &ColumnNames) -> Result<String> {
        let code = Template::named(&format!("{}_query", self.template_prefix()))?
            .fill_expressions([
                ("QUERY_NAME", names.query.as_str()),
                ("CONFIG_NAME", names.config.as_str()),
                ("STATS_NAME", names.stats.as_str()),
            ])?
            .fill_values([("GROUP_NAMES", ctx.group_names())])?
            .finish()?;
        Ok(code)
    }

    fn make_output(
        &self,
        ctx: &EmitContext<'_>,
        column_name: &str,
        names: &ColumnNames,
    ) -> Result<String> {
        let name = format!("{}_{}_output", self.template_prefix(), ctx.form.as_str());
        let code = Template::named(&name)?
            .fill_expressions([("STATS_NAME", names.stats.as_str())])?
            .fill_values([("COLUMN_NAME", column_name)])?
            .finish()?;
        Ok(code)
    }

    fn make_report_kv(
        &self,
        column_name: &str,
        _confidence: f64,
        names: &ColumnNames,
    ) -> Result<String> {
        let code = Template::named(&format!("{}_report_kv", self.template_prefix()))?
            .fill_expressions([("STATS_NAME", names.stats.as_str())])?
            .fill_values([("COLUMN_NAME", column_name)])?
            .finish()?;
        Ok(code.trim_end().to_string())
    }
}

/// Name to emitter table.
pub struct AnalysisRegistry {
    analyses: BTreeMap<&'static str, Box<dyn Analysis>>,
}

impl AnalysisRegistry {
    /// Registry with every built-in kind.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        histogram::register(&mut registry);
        mean::register(&mut registry);
        median::register(&mut registry);
        quantile::register(&mut registry);
        count::register(&mut registry);
        stdeviation::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            analyses: BTreeMap::new(),
        }
    }

    pub fn register_analysis(&mut self, analysis: Box<dyn Analysis>) {
        self.analyses.insert(analysis.name(), analysis);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Analysis> {
        self.analyses
            .get(name)
            .map(|analysis| analysis.as_ref())
            .ok_or_else(|| CodegenError::UnrecognizedAnalysis {
                name: name.to_string(),
            })
    }

    /// Registered kind names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.analyses.keys().copied().collect()
    }
}

impl Default for AnalysisRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn registry() -> &'static AnalysisRegistry {
    static REGISTRY: OnceLock<AnalysisRegistry> = OnceLock::new();
    REGISTRY.get_or_init(AnalysisRegistry::new)
}

/// Built-in emitter for `analysis_type`.
pub fn get_analysis_by_name(name: &str) -> Result<&'static dyn Analysis> {
    registry().get(name)
}

/// Config block for one column. Needs no plan, so callers can preview it.
pub fn make_column_config_block(
    name: &str,
    analysis_type: &str,
    lower_bound: f64,
    upper_bound: f64,
    bin_count: u32,
) -> Result<String> {
    get_analysis_by_name(analysis_type)?.make_column_config_block(&ColumnConfig {
        name,
        lower_bound,
        upper_bound,
        bin_count,
    })
}

pub fn make_query(ctx: &EmitContext<'_>, column_name: &str, analysis_type: &str) -> Result<String> {
    get_analysis_by_name(analysis_type)?.make_query(ctx, &ColumnNames::new(column_name))
}

pub fn make_output(
    ctx: &EmitContext<'_>,
    column_name: &str,
    analysis_type: &str,
) -> Result<String> {
    get_analysis_by_name(analysis_type)?.make_output(ctx, column_name, &ColumnNames::new(column_name))
}

pub fn make_report_kv(column_name: &str, analysis_type: &str, confidence: f64) -> Result<String> {
    get_analysis_by_name(analysis_type)?.make_report_kv(
        column_name,
        confidence,
        &ColumnNames::new(column_name),
    )
}

/// Config block shared by kinds that only need clamping bounds.
pub(crate) fn bounded_config_block(template: &str, column: &ColumnConfig<'_>) -> Result<String> {
    let names = ColumnNames::new(column.name);
    let code = Template::named(template)?
        .fill_expressions([("CONFIG_NAME", names.config.as_str())])?
        .fill_values([
            ("LOWER_BOUND", PyValue::number(column.lower_bound)),
            ("UPPER_BOUND", PyValue::number(column.upper_bound)),
        ])?
        .fill_values([("COLUMN_NAME", column.name)])?
        .finish()?;
    Ok(code)
}
