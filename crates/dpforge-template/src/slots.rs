use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{Result, TemplateError};

/// Slots are all caps or underscores, start with a letter, are at least three
/// characters long and have a word boundary on either side.
pub const SLOT_PATTERN: &str = r"\b[A-Z][A-Z_]{2,}\b";

/// How a slot is meant to be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Raw code spliced in verbatim.
    Expression,
    /// A value rendered as a Python literal.
    Value,
    /// A multi-line block that owns its whole line.
    Block,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Expression => write!(f, "expression"),
            SlotKind::Value => write!(f, "value"),
            SlotKind::Block => write!(f, "block"),
        }
    }
}

/// Declared slot of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDecl {
    pub name: &'static str,
    pub kind: SlotKind,
}

impl SlotDecl {
    pub const fn expression(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Expression,
        }
    }

    pub const fn value(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Value,
        }
    }

    pub const fn block(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Block,
        }
    }
}

/// One-based position of a slot occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPosition {
    pub line: usize,
    pub column: usize,
}

/// Slot occurrences found in a template's text when it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotIndex {
    positions: BTreeMap<String, Vec<SlotPosition>>,
}

impl SlotIndex {
    pub fn scan(text: &str) -> Self {
        let mut positions: BTreeMap<String, Vec<SlotPosition>> = BTreeMap::new();
        for (line_index, line) in text.split('\n').enumerate() {
            for found in slot_regex().find_iter(line) {
                positions
                    .entry(found.as_str().to_string())
                    .or_default()
                    .push(SlotPosition {
                        line: line_index + 1,
                        column: line[..found.start()].chars().count() + 1,
                    });
            }
        }
        Self { positions }
    }

    /// Slot names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.positions.contains_key(slot)
    }

    pub fn first(&self, slot: &str) -> Option<SlotPosition> {
        self.positions
            .get(slot)
            .and_then(|positions| positions.first().copied())
    }

    pub fn occurrences(&self, slot: &str) -> &[SlotPosition] {
        self.positions.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Every distinct slot-shaped token in `text`.
pub fn find_slots(text: &str) -> BTreeSet<String> {
    slot_regex()
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect()
}

pub(crate) fn slot_regex() -> &'static Regex {
    static SLOT_RE: OnceLock<Regex> = OnceLock::new();
    SLOT_RE.get_or_init(|| Regex::new(SLOT_PATTERN).expect("slot pattern is a valid regex"))
}

/// Matches `key` with a word boundary on either side.
pub(crate) fn word_regex(key: &str) -> Result<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(key)))
        .map_err(|err| TemplateError::Configuration(format!("invalid slot '{key}': {err}")))
}

/// Matches `key` alone on its line, capturing the leading indentation.
pub(crate) fn block_regex(key: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?m)^([ \t]*){}$", regex::escape(key)))
        .map_err(|err| TemplateError::Configuration(format!("invalid slot '{key}': {err}")))
}
