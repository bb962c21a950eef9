use std::collections::BTreeSet;
use std::ops::Range;

use regex::{Captures, Regex};
use tracing::debug;

use crate::catalog::{CatalogEntry, catalog};
use crate::errors::{Result, TemplateError};
use crate::literal::PyValue;
use crate::slots::{SlotIndex, SlotKind, block_regex, slot_regex, word_regex};

const STRING_TEMPLATE: &str = "string template";

/// One piece of Python source with `ALL_CAPS` slots waiting to be filled.
///
/// Fills consume the template and hand it back, so a fragment is built as a
/// single chain ending in [`Template::finish`].
///
/// Substituted text is never scanned again: later fills and `finish` only
/// see what is left of the template's own text.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    label: String,
    initial: SlotIndex,
    entry: Option<CatalogEntry>,
    /// Byte ranges of `text` produced by fills, sorted and disjoint.
    filled: Vec<Range<usize>>,
}

impl Template {
    /// Literal template text. Any slot may be filled with any kind.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let initial = SlotIndex::scan(&text);
        Self {
            text,
            label: STRING_TEMPLATE.to_string(),
            initial,
            entry: None,
            filled: Vec::new(),
        }
    }

    /// Catalog template looked up by name.
    pub fn named(name: &str) -> Result<Self> {
        let entry = catalog()?
            .entry(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;
        debug!(event = "template_loaded", template = name, slots = entry.slots.len());
        Ok(Self {
            text: entry.text.to_string(),
            label: format!("'{}'", entry.name),
            initial: SlotIndex::scan(entry.text),
            entry: Some(*entry),
            filled: Vec::new(),
        })
    }

    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }

    /// Where the text came from, as used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Slots found when the template was created.
    pub fn initial_slots(&self) -> &SlotIndex {
        &self.initial
    }

    /// Replace each key with its value verbatim.
    pub fn fill_expressions<I, K, V>(mut self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in entries {
            let (key, value) = (key.as_ref(), value.as_ref());
            self.check_kind(key, SlotKind::Expression)?;
            self.replace_word(key, value, value)?;
        }
        Ok(self)
    }

    /// Replace each key with the Python literal for its value.
    pub fn fill_values<I, K, V>(mut self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PyValue>,
    {
        for (key, value) in entries {
            let key = key.as_ref();
            let value = value.into();
            self.check_kind(key, SlotKind::Value)?;
            self.replace_word(key, &value.to_string(), &value.to_plain_string())?;
        }
        Ok(self)
    }

    /// Replace slots that sit alone on their line with a multi-line block,
    /// indenting every line of the block like the slot.
    pub fn fill_blocks<I, K, V>(mut self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PyValue>,
    {
        for (key, value) in entries {
            let key = key.as_ref();
            let block = match value.into() {
                PyValue::Str(block) => block,
                other => {
                    return Err(TemplateError::BlockType {
                        slot: key.to_string(),
                        value: other.to_plain_string(),
                        template: self.label.clone(),
                    });
                }
            };
            self.check_kind(key, SlotKind::Block)?;

            let pattern = block_regex(key)?;
            let count = self.substitute(&pattern, |caps| {
                let indent = caps.get(1).map_or("", |found| found.as_str());
                block
                    .split('\n')
                    .map(|line| format!("{indent}{line}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            if count == 0 {
                let misplaced = self.unfilled_matches(&word_regex(key)?).next().is_some();
                return Err(if misplaced {
                    TemplateError::MisplacedBlockSlot {
                        slot: key.to_string(),
                        value: block,
                        template: self.label.clone(),
                        text: self.text.clone(),
                    }
                } else {
                    self.missing(key, &block)
                });
            }
        }
        Ok(self)
    }

    /// Final text, provided every slot present at creation has been filled.
    ///
    /// Filled values may themselves contain slot-shaped words; only the
    /// template's own text is checked.
    pub fn finish(self) -> Result<String> {
        let remaining: BTreeSet<&str> = self
            .unfilled_matches(slot_regex())
            .map(|range| &self.text[range])
            .collect();
        let unfilled: Vec<String> = self
            .initial
            .names()
            .filter(|slot| remaining.contains(slot))
            .map(str::to_string)
            .collect();

        if unfilled.is_empty() {
            return Ok(self.text);
        }

        let lines = unfilled
            .iter()
            .filter_map(|slot| self.initial.first(slot))
            .map(|position| position.line)
            .collect();
        Err(TemplateError::UnfilledSlot {
            slots: unfilled,
            lines,
            template: self.label,
            text: self.text,
        })
    }

    fn check_kind(&self, slot: &str, used: SlotKind) -> Result<()> {
        match self.entry.and_then(|entry| entry.kind_of(slot)) {
            Some(declared) if declared != used => Err(TemplateError::SlotKindMismatch {
                slot: slot.to_string(),
                declared,
                used,
                template: self.label.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn replace_word(&mut self, key: &str, replacement: &str, shown: &str) -> Result<()> {
        let pattern = word_regex(key)?;
        if self.substitute(&pattern, |_| replacement.to_string()) == 0 {
            return Err(self.missing(key, shown));
        }
        Ok(())
    }

    fn is_filled(&self, range: &Range<usize>) -> bool {
        self.filled
            .iter()
            .any(|span| span.start < range.end && range.start < span.end)
    }

    /// Matches of `pattern` lying entirely in the template's own text.
    fn unfilled_matches<'a>(
        &'a self,
        pattern: &'a Regex,
    ) -> impl Iterator<Item = Range<usize>> + 'a {
        pattern
            .find_iter(&self.text)
            .map(|found| found.range())
            .filter(move |range| !self.is_filled(range))
    }

    /// Replace every unfilled match of `pattern` with `render(match)` and
    /// record the inserted spans. Returns the number of replacements.
    fn substitute<F>(&mut self, pattern: &Regex, mut render: F) -> usize
    where
        F: FnMut(&Captures<'_>) -> String,
    {
        let mut text = String::with_capacity(self.text.len());
        let mut inserted = Vec::new();
        // (end of the replaced range in the old text, length change)
        let mut shifts: Vec<(usize, isize)> = Vec::new();
        let mut last = 0;

        for caps in pattern.captures_iter(&self.text) {
            let Some(whole) = caps.get(0) else { continue };
            if self.is_filled(&whole.range()) {
                continue;
            }
            text.push_str(&self.text[last..whole.start()]);
            let replacement = render(&caps);
            let start = text.len();
            text.push_str(&replacement);
            inserted.push(start..text.len());
            shifts.push((whole.end(), replacement.len() as isize - whole.len() as isize));
            last = whole.end();
        }

        if inserted.is_empty() {
            return 0;
        }
        text.push_str(&self.text[last..]);

        let count = inserted.len();
        let mut filled: Vec<Range<usize>> = self
            .filled
            .iter()
            .map(|span| {
                let delta: isize = shifts
                    .iter()
                    .filter(|(end, _)| *end <= span.start)
                    .map(|(_, delta)| delta)
                    .sum();
                let start = span.start.saturating_add_signed(delta);
                start..start + span.len()
            })
            .chain(inserted)
            .collect();
        filled.sort_by_key(|span| span.start);

        self.text = text;
        self.filled = filled;
        count
    }

    fn missing(&self, key: &str, shown: &str) -> TemplateError {
        TemplateError::MissingSlot {
            slot: key.to_string(),
            value: shown.to_string(),
            template: self.label.clone(),
            text: self.text.clone(),
        }
    }
}

/// Builds a [`Template`] from exactly one of a catalog name or literal text.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    name: Option<String>,
    literal: Option<String>,
}

impl TemplateBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn literal(mut self, text: impl Into<String>) -> Self {
        self.literal = Some(text.into());
        self
    }

    pub fn build(self) -> Result<Template> {
        match (self.name, self.literal) {
            (Some(name), None) => Template::named(&name),
            (None, Some(text)) => Ok(Template::new(text)),
            (Some(_), Some(_)) => Err(TemplateError::Configuration(
                "\"name\" and \"literal\" are mutually exclusive".to_string(),
            )),
            (None, None) => Err(TemplateError::Configuration(
                "one of \"name\" or \"literal\" is required".to_string(),
            )),
        }
    }
}
