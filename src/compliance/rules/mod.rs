//! Per-profile rule tables consulted by the structure checker.

pub mod actions;
pub mod annotations;
pub mod embedded_files;
pub mod fonts;

pub use actions::{ActionContext, ActionPolicy, ActionRules, AdditionalActionsPolicy};
pub use annotations::AnnotationRules;
pub use embedded_files::{EmbeddedFilePolicy, EmbeddedFileRules};
pub use fonts::FontRules;
