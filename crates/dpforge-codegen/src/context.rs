//! The `dp.Context` assembly: privacy unit, privacy loss, margins and the
//! per-column budget split.

use dpforge_plan::AnalysisPlan;
use dpforge_template::{PyValue, Template};

use crate::analyses::get_analysis_by_name;
use crate::errors::Result;
use crate::generator::GeneratorOptions;
use crate::naming::ColumnNames;

pub fn make_privacy_unit_block(contributions: u32) -> Result<String> {
    let code = Template::named("privacy_unit")?
        .fill_values([("CONTRIBUTIONS", contributions)])?
        .finish()?;
    Ok(code)
}

pub fn make_privacy_loss_block(epsilon: f64, delta: f64) -> Result<String> {
    let code = Template::named("privacy_loss")?
        .fill_values([
            ("EPSILON", PyValue::number(epsilon)),
            ("DELTA", PyValue::Float(delta)),
        ])?
        .finish()?;
    Ok(code)
}

/// Python list of `dp.polars.Margin`s: one bounding partition lengths under
/// the plan's groups, then one publishing the keys of each bin column.
pub fn make_margins_list(
    bin_names: &[String],
    groups: &[String],
    options: &GeneratorOptions,
) -> String {
    let quoted_groups: Vec<String> = groups
        .iter()
        .map(|group| PyValue::from(group).to_string())
        .collect();

    let mut margins = vec![
        "[".to_string(),
        "        # \"max_partition_length\" should be a loose upper bound,".to_string(),
        "        # for example, the size of the total population being sampled.".to_string(),
        "        # https://docs.opendp.org/en/stable/api/python/opendp.extras.polars.html#opendp.extras.polars.Margin.max_partition_length".to_string(),
        format!(
            "        dp.polars.Margin(by=[{}], public_info='lengths', max_partition_length={}, max_num_partitions={}),",
            quoted_groups.join(", "),
            options.max_partition_length,
            options.max_num_partitions,
        ),
    ];
    for bin_name in bin_names {
        let by: Vec<String> = std::iter::once(PyValue::from(bin_name).to_string())
            .chain(quoted_groups.iter().cloned())
            .collect();
        margins.push(format!(
            "        dp.polars.Margin(by=[{}], public_info='keys',),",
            by.join(", ")
        ));
    }
    margins.push("    ]".to_string());
    margins.join("\n")
}

/// Context template with everything but the data source filled in.
pub(crate) fn make_partial_context(
    plan: &AnalysisPlan,
    options: &GeneratorOptions,
) -> Result<Template> {
    let mut bin_names = Vec::new();
    let mut extra_columns = Vec::new();
    let mut weights = Vec::with_capacity(plan.columns.len());
    for (name, column) in plan.columns.iter() {
        weights.push(column.weight);
        if get_analysis_by_name(&column.analysis_type)?.has_bins() {
            let names = ColumnNames::new(name);
            bin_names.push(names.bin);
            extra_columns.push(names.config);
        }
    }

    let template = Template::named("context")?
        .fill_blocks([
            ("PRIVACY_UNIT_BLOCK", make_privacy_unit_block(plan.contributions)?),
            (
                "PRIVACY_LOSS_BLOCK",
                make_privacy_loss_block(plan.epsilon, options.delta)?,
            ),
        ])?
        .fill_expressions([("EXTRA_COLUMNS", extra_columns.join(", "))])?
        .fill_values([("WEIGHTS", weights)])?
        .fill_expressions([(
            "MARGINS_LIST",
            make_margins_list(&bin_names, &plan.groups, options),
        )])?;
    Ok(template)
}
