use std::collections::{BTreeMap, HashSet};
use std::fmt;

use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Names of the supported statistics, as they appear in `analysis_type`.
pub mod analysis_type {
    pub const HISTOGRAM: &str = "Histogram";
    pub const MEAN: &str = "Mean";
    pub const MEDIAN: &str = "Median";
    pub const QUANTILE: &str = "Quantile";
    pub const COUNT: &str = "Count";
    pub const STANDARD_DEVIATION: &str = "Standard Deviation";

    pub const ALL: [&str; 6] = [HISTOGRAM, MEAN, MEDIAN, QUANTILE, COUNT, STANDARD_DEVIATION];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// How one column should be summarized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisPlanColumn {
    /// Statistic to release (ex.: "Histogram", "Mean").
    pub analysis_type: String,
    /// Lower clamping bound; must be below `upper_bound`.
    pub lower_bound: f64,
    /// Upper clamping bound.
    pub upper_bound: f64,
    /// Number of bins; only histograms use it.
    #[serde(default)]
    pub bin_count: u32,
    /// Relative share of the privacy budget spent on this column.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl AnalysisPlanColumn {
    pub fn new(
        analysis_type: impl Into<String>,
        lower_bound: f64,
        upper_bound: f64,
        bin_count: u32,
        weight: u32,
    ) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            lower_bound,
            upper_bound,
            bin_count,
            weight,
        }
    }

    pub fn histogram(lower_bound: f64, upper_bound: f64, bin_count: u32) -> Self {
        Self::new(
            analysis_type::HISTOGRAM,
            lower_bound,
            upper_bound,
            bin_count,
            default_weight(),
        )
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Column name to analysis, in the order the user added them.
///
/// Serialized as a plain object. Key order survives a round trip and a
/// repeated key is a deserialization error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanColumns(Vec<(String, AnalysisPlanColumn)>);

impl PlanColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, or replaces an existing one in place.
    pub fn insert(&mut self, name: impl Into<String>, column: AnalysisPlanColumn) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = column,
            None => self.0.push((name, column)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AnalysisPlanColumn> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, column)| column)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<AnalysisPlanColumn> {
        let index = self.0.iter().position(|(existing, _)| existing == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnalysisPlanColumn)> {
        self.0.iter().map(|(name, column)| (name.as_str(), column))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AnalysisPlanColumn)> for PlanColumns {
    fn from_iter<I: IntoIterator<Item = (K, AnalysisPlanColumn)>>(iter: I) -> Self {
        let mut columns = PlanColumns::new();
        for (name, column) in iter {
            columns.insert(name, column);
        }
        columns
    }
}

impl Serialize for PlanColumns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, column) in &self.0 {
            map.serialize_entry(name, column)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlanColumns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PlanColumnsVisitor)
    }
}

struct PlanColumnsVisitor;

impl<'de> Visitor<'de> for PlanColumnsVisitor {
    type Value = PlanColumns;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of column name to analysis")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, column)) = access.next_entry::<String, AnalysisPlanColumn>()? {
            if !seen.insert(name.clone()) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate column '{name}'"
                )));
            }
            entries.push((name, column));
        }
        Ok(PlanColumns(entries))
    }
}

impl JsonSchema for PlanColumns {
    fn schema_name() -> String {
        "PlanColumns".to_string()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        <BTreeMap<String, AnalysisPlanColumn>>::json_schema(generator)
    }
}

/// Everything the code generator needs to emit a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisPlan {
    /// Private data file. Only the notebook form embeds it; scripts take it
    /// as a command line argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
    /// Maximum number of rows any one individual contributes.
    pub contributions: u32,
    /// Total privacy budget.
    pub epsilon: f64,
    /// Columns to group every statistic by, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    pub columns: PlanColumns,
}

impl AnalysisPlan {
    pub fn builder(contributions: u32, epsilon: f64) -> AnalysisPlanBuilder {
        AnalysisPlanBuilder::new(contributions, epsilon)
    }

    /// Builder seeded with this plan, for single-field updates.
    pub fn to_builder(&self) -> AnalysisPlanBuilder {
        AnalysisPlanBuilder { plan: self.clone() }
    }

    /// Copy of the plan with one column added or replaced in place.
    pub fn with_column(&self, name: impl Into<String>, column: AnalysisPlanColumn) -> Self {
        self.to_builder().column(name, column).build()
    }
}

/// Explicit construction of an [`AnalysisPlan`].
#[derive(Debug, Clone)]
pub struct AnalysisPlanBuilder {
    plan: AnalysisPlan,
}

impl AnalysisPlanBuilder {
    pub fn new(contributions: u32, epsilon: f64) -> Self {
        Self {
            plan: AnalysisPlan {
                csv_path: None,
                contributions,
                epsilon,
                groups: Vec::new(),
                columns: PlanColumns::new(),
            },
        }
    }

    pub fn csv_path(mut self, csv_path: impl Into<String>) -> Self {
        self.plan.csv_path = Some(csv_path.into());
        self
    }

    pub fn contributions(mut self, contributions: u32) -> Self {
        self.plan.contributions = contributions;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.plan.epsilon = epsilon;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.plan.groups.push(group.into());
        self
    }

    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn column(mut self, name: impl Into<String>, column: AnalysisPlanColumn) -> Self {
        self.plan.columns.insert(name, column);
        self
    }

    pub fn without_column(mut self, name: &str) -> Self {
        self.plan.columns.remove(name);
        self
    }

    pub fn build(self) -> AnalysisPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(lower: f64, upper: f64) -> AnalysisPlanColumn {
        AnalysisPlanColumn::new(analysis_type::MEAN, lower, upper, 0, 1)
    }

    #[test]
    fn replacing_a_column_keeps_its_position() {
        let plan = AnalysisPlan::builder(1, 1.0)
            .column("a", mean(0.0, 1.0))
            .column("b", mean(0.0, 2.0))
            .column("c", mean(0.0, 3.0))
            .build();
        let updated = plan.with_column("b", mean(-1.0, 1.0));

        let names: Vec<&str> = updated.columns.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(updated.columns.get("b"), Some(&mean(-1.0, 1.0)));
        assert_eq!(plan.columns.get("b"), Some(&mean(0.0, 2.0)));
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let plan: AnalysisPlan = serde_json::from_str(
            r#"{"contributions": 1, "epsilon": 1, "columns": {"x": {"analysis_type": "Mean", "lower_bound": 0, "upper_bound": 10}}}"#,
        )
        .expect("parse plan");
        assert_eq!(plan.csv_path, None);
        assert!(plan.groups.is_empty());
        let column = plan.columns.get("x").expect("column");
        assert_eq!(column.bin_count, 0);
        assert_eq!(column.weight, 1);
    }

    #[test]
    fn known_analysis_types() {
        assert!(analysis_type::is_known("Standard Deviation"));
        assert!(!analysis_type::is_known("Mode"));
    }
}
