use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{CodegenError, Result};

fn non_word_regex() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"\W+").expect("non-word pattern is a valid regex"))
}

/// Python identifier derived from a column name.
///
/// Lower-cases the name, collapses each run of non-word characters into one
/// underscore, and prefixes an underscore unless the result starts with a
/// letter.
pub fn name_to_identifier(name: &str) -> String {
    let lowered = name.to_lowercase();
    let identifier = non_word_regex().replace_all(&lowered, "_").into_owned();
    match identifier.chars().next() {
        Some(first) if first.is_alphabetic() => identifier,
        _ => format!("_{identifier}"),
    }
}

/// Variable names generated code uses for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub identifier: String,
    pub config: String,
    pub cut_points: String,
    pub bin: String,
    pub query: String,
    pub accuracy: String,
    pub stats: String,
}

impl ColumnNames {
    pub fn new(column_name: &str) -> Self {
        let identifier = name_to_identifier(column_name);
        Self {
            config: format!("{identifier}_config"),
            cut_points: format!("{identifier}_cut_points"),
            bin: format!("{identifier}_bin"),
            query: format!("{identifier}_query"),
            accuracy: format!("{identifier}_accuracy"),
            stats: format!("{identifier}_stats"),
            identifier,
        }
    }

    /// Every Python variable the generated code binds for this column.
    pub fn variables(&self) -> [&str; 6] {
        [
            self.config.as_str(),
            self.cut_points.as_str(),
            self.bin.as_str(),
            self.query.as_str(),
            self.accuracy.as_str(),
            self.stats.as_str(),
        ]
    }
}

/// Distinct columns must not share a generated variable, or one column's
/// expressions would silently overwrite another's.
pub fn check_identifiers<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for column in columns {
        let names = ColumnNames::new(column);
        for variable in names.variables() {
            match owners.entry(variable.to_string()) {
                Entry::Occupied(owner) => {
                    return Err(CodegenError::IdentifierCollision {
                        first: owner.get().to_string(),
                        second: column.to_string(),
                        variable: variable.to_string(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(column);
                }
            }
        }
    }
    Ok(())
}

/// Column name made safe for a one-line comment.
pub(crate) fn comment_safe(name: &str) -> String {
    name.replace(['\r', '\n'], " ")
}
