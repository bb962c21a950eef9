use thiserror::Error;

use crate::slots::SlotKind;

/// Errors raised while building, filling or finishing a template.
///
/// Every variant is a contract violation between the catalog and the code
/// that fills it, so none of them is recoverable inside a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template construction was given conflicting or missing sources.
    #[error("invalid template configuration: {0}")]
    Configuration(String),
    /// No catalog entry exists under the requested name.
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
    /// A fill key matched nothing in the current text.
    #[error("No '{slot}' slot to fill with '{value}' in {template}:\n\n{text}")]
    MissingSlot {
        slot: String,
        value: String,
        template: String,
        text: String,
    },
    /// `finish` found slots from the original text that were never filled.
    #[error("{} slot not filled in {template}:\n\n{text}", quoted(.slots))]
    UnfilledSlot {
        slots: Vec<String>,
        /// Line of the first original occurrence of each unfilled slot.
        lines: Vec<usize>,
        template: String,
        text: String,
    },
    /// A block slot exists but shares its line with other text.
    #[error(
        "Block slots must be alone on line; No '{slot}' slot to fill with '{value}' in {template}:\n\n{text}"
    )]
    MisplacedBlockSlot {
        slot: String,
        value: String,
        template: String,
        text: String,
    },
    /// `fill_blocks` was handed something other than text.
    #[error("For {slot} in {template}, expected string, not {value}")]
    BlockType {
        slot: String,
        value: String,
        template: String,
    },
    /// A catalog slot was filled with a different kind than it declares.
    #[error("slot '{slot}' in {template} is declared as {declared}, but was filled as {used}")]
    SlotKindMismatch {
        slot: String,
        declared: SlotKind,
        used: SlotKind,
        template: String,
    },
    /// The embedded catalog failed verification at load.
    #[error("template catalog entry '{entry}' is invalid: {message}")]
    Catalog { entry: String, message: String },
}

fn quoted(slots: &[String]) -> String {
    slots
        .iter()
        .map(|slot| format!("'{slot}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
