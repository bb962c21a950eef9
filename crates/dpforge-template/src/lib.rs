//! Slot-filling templates for generated Python.
//!
//! A template is Python source where `ALL_CAPS` words of three or more
//! characters are slots. Slots are filled as raw expressions, as Python
//! literals, or as indented blocks, and `finish` refuses to hand back text
//! that still contains any slot the template started with.

pub mod catalog;
pub mod errors;
pub mod literal;
pub mod slots;
pub mod template;

pub use catalog::{Catalog, CatalogEntry, catalog};
pub use errors::TemplateError;
pub use literal::PyValue;
pub use slots::{SLOT_PATTERN, SlotDecl, SlotIndex, SlotKind, SlotPosition, find_slots};
pub use template::{Template, TemplateBuilder};
