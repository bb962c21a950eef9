//! Named Python snippets embedded at build time.
//!
//! Every entry declares how each of its slots is filled. The declarations are
//! checked against the text once, the first time the catalog is used.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use tracing::debug;

use crate::errors::{Result, TemplateError};
use crate::slots::{SlotDecl, SlotIndex, SlotKind, block_regex, word_regex};

/// One named snippet and the fill kind of each of its slots.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub text: &'static str,
    pub slots: &'static [SlotDecl],
}

impl CatalogEntry {
    pub const fn new(name: &'static str, text: &'static str, slots: &'static [SlotDecl]) -> Self {
        Self { name, text, slots }
    }

    pub fn kind_of(&self, slot: &str) -> Option<SlotKind> {
        self.slots
            .iter()
            .find(|decl| decl.name == slot)
            .map(|decl| decl.kind)
    }
}

macro_rules! entry {
    ($name:literal, $slots:expr) => {
        CatalogEntry::new(
            $name,
            include_str!(concat!("../templates/", $name, ".py")),
            &$slots,
        )
    };
}

use SlotDecl as S;

const ENTRIES: &[CatalogEntry] = &[
    entry!("imports", []),
    entry!("utils", []),
    entry!("privacy_unit", [S::value("CONTRIBUTIONS")]),
    entry!("privacy_loss", [S::value("EPSILON"), S::value("DELTA")]),
    entry!(
        "context",
        [
            S::block("PRIVACY_UNIT_BLOCK"),
            S::block("PRIVACY_LOSS_BLOCK"),
            S::expression("CSV_PATH"),
            S::expression("EXTRA_COLUMNS"),
            S::value("WEIGHTS"),
            S::expression("MARGINS_LIST"),
        ]
    ),
    entry!(
        "notebook",
        [
            S::expression("DEPENDENCIES"),
            S::block("IMPORTS_BLOCK"),
            S::block("UTILS_BLOCK"),
            S::block("COLUMNS_BLOCK"),
            S::block("CONTEXT_BLOCK"),
            S::block("QUERIES_BLOCK"),
            S::block("REPORTS_BLOCK"),
        ]
    ),
    entry!(
        "script",
        [
            S::expression("DEPENDENCIES"),
            S::block("IMPORTS_BLOCK"),
            S::block("UTILS_BLOCK"),
            S::block("COLUMNS_BLOCK"),
            S::block("CONTEXT_BLOCK"),
            S::block("QUERIES_BLOCK"),
        ]
    ),
    entry!(
        "reports",
        [
            S::value("CSV_PATH"),
            S::value("EPSILON"),
            S::expression("COLUMNS"),
            S::expression("OUTPUTS"),
            S::value("TXT_REPORT_PATH"),
            S::value("CSV_REPORT_PATH"),
        ]
    ),
    // histogram
    entry!(
        "histogram_config",
        [
            S::value("COLUMN_NAME"),
            S::expression("CUT_LIST_NAME"),
            S::value("LOWER_BOUND"),
            S::value("UPPER_BOUND"),
            S::value("BIN_COUNT"),
            S::expression("CONFIG_NAME"),
            S::value("BIN_COLUMN_NAME"),
        ]
    ),
    entry!(
        "histogram_query",
        [
            S::value("BIN_NAME"),
            S::value("GROUP_NAMES"),
            S::expression("QUERY_NAME"),
            S::expression("ACCURACY_NAME"),
            S::expression("STATS_NAME"),
        ]
    ),
    entry!(
        "histogram_notebook_output",
        [
            S::expression("CONFIDENCE_NOTE"),
            S::value("COLUMN_NAME"),
            S::value("GROUP_NAMES"),
            S::expression("STATS_NAME"),
            S::expression("ACCURACY_NAME"),
        ]
    ),
    entry!(
        "histogram_script_output",
        [
            S::expression("CONFIDENCE_NOTE"),
            S::value("COLUMN_NAME"),
            S::expression("ACCURACY_NAME"),
            S::expression("STATS_NAME"),
        ]
    ),
    entry!(
        "histogram_report_kv",
        [
            S::value("COLUMN_NAME"),
            S::value("CONFIDENCE"),
            S::expression("ACCURACY_NAME"),
            S::expression("STATS_NAME"),
        ]
    ),
    // mean
    entry!("mean_config", BOUNDED_CONFIG),
    entry!("mean_query", GROUPED_QUERY),
    entry!("mean_notebook_output", COLUMN_OUTPUT),
    entry!("mean_script_output", COLUMN_OUTPUT),
    entry!("mean_report_kv", STATS_REPORT),
    // median
    entry!("median_config", BOUNDED_CONFIG),
    entry!("median_query", GROUPED_QUERY),
    entry!("median_notebook_output", COLUMN_OUTPUT),
    entry!("median_script_output", COLUMN_OUTPUT),
    entry!("median_report_kv", STATS_REPORT),
    // quantile
    entry!(
        "quantile_config",
        [
            S::expression("CONFIG_NAME"),
            S::value("COLUMN_NAME"),
            S::value("LOWER_BOUND"),
            S::value("UPPER_BOUND"),
            S::value("QUANTILES"),
        ]
    ),
    entry!("quantile_query", GROUPED_QUERY),
    entry!("quantile_notebook_output", COLUMN_OUTPUT),
    entry!("quantile_script_output", COLUMN_OUTPUT),
    entry!("quantile_report_kv", STATS_REPORT),
    // count
    entry!(
        "count_config",
        [S::expression("CONFIG_NAME"), S::value("COLUMN_NAME")]
    ),
    entry!("count_query", GROUPED_QUERY),
    entry!("count_notebook_output", COLUMN_OUTPUT),
    entry!("count_script_output", COLUMN_OUTPUT),
    entry!("count_report_kv", STATS_REPORT),
    // standard deviation
    entry!(
        "stdeviation_config",
        [
            S::expression("CONFIG_NAME"),
            S::value("COLUMN_NAME"),
            S::value("LOWER_BOUND"),
            S::value("UPPER_BOUND"),
            S::value("SQUARE_LOWER_BOUND"),
            S::value("SQUARE_UPPER_BOUND"),
        ]
    ),
    entry!("stdeviation_query", GROUPED_QUERY),
    entry!("stdeviation_notebook_output", COLUMN_OUTPUT),
    entry!("stdeviation_script_output", COLUMN_OUTPUT),
    entry!("stdeviation_report_kv", STATS_REPORT),
];

const BOUNDED_CONFIG: [SlotDecl; 4] = [
    S::expression("CONFIG_NAME"),
    S::value("COLUMN_NAME"),
    S::value("LOWER_BOUND"),
    S::value("UPPER_BOUND"),
];

const GROUPED_QUERY: [SlotDecl; 4] = [
    S::value("GROUP_NAMES"),
    S::expression("QUERY_NAME"),
    S::expression("CONFIG_NAME"),
    S::expression("STATS_NAME"),
];

const COLUMN_OUTPUT: [SlotDecl; 2] = [S::value("COLUMN_NAME"), S::expression("STATS_NAME")];

const STATS_REPORT: [SlotDecl; 2] = [S::value("COLUMN_NAME"), S::expression("STATS_NAME")];

/// Verified, name-keyed view of the embedded snippets.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: BTreeMap<&'static str, CatalogEntry>,
}

impl Catalog {
    /// Verifies and indexes the embedded entries.
    pub fn load() -> Result<Self> {
        Self::from_entries(ENTRIES)
    }

    pub fn from_entries(entries: &[CatalogEntry]) -> Result<Self> {
        let mut indexed = BTreeMap::new();
        for entry in entries {
            verify_entry(entry)?;
            if indexed.insert(entry.name, *entry).is_some() {
                return Err(catalog_error(entry, "duplicate entry name".to_string()));
            }
        }
        debug!(event = "catalog_loaded", entries = indexed.len());
        Ok(Self { entries: indexed })
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide catalog. A verification failure is returned on every call.
pub fn catalog() -> Result<&'static Catalog> {
    static CATALOG: OnceLock<Result<Catalog>> = OnceLock::new();
    CATALOG
        .get_or_init(Catalog::load)
        .as_ref()
        .map_err(Clone::clone)
}

fn verify_entry(entry: &CatalogEntry) -> Result<()> {
    let mut declared = BTreeSet::new();
    for decl in entry.slots {
        if !declared.insert(decl.name) {
            return Err(catalog_error(
                entry,
                format!("slot '{}' declared twice", decl.name),
            ));
        }
    }

    let scanned = SlotIndex::scan(entry.text);
    let found: BTreeSet<&str> = scanned.names().collect();
    if found != declared {
        let undeclared: Vec<&str> = found.difference(&declared).copied().collect();
        let absent: Vec<&str> = declared.difference(&found).copied().collect();
        return Err(catalog_error(
            entry,
            format!("undeclared slots {undeclared:?}, declared but absent {absent:?}"),
        ));
    }

    for decl in entry.slots.iter().filter(|decl| decl.kind == SlotKind::Block) {
        let alone = block_regex(decl.name)?.find_iter(entry.text).count();
        let total = word_regex(decl.name)?.find_iter(entry.text).count();
        if alone != total {
            return Err(catalog_error(
                entry,
                format!("block slot '{}' must be alone on its line", decl.name),
            ));
        }
    }
    Ok(())
}

fn catalog_error(entry: &CatalogEntry, message: String) -> TemplateError {
    TemplateError::Catalog {
        entry: entry.name.to_string(),
        message,
    }
}
