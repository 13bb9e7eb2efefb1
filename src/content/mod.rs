//! Content streams: operators, graphics state tracking and checking.
//!
//! The same [`ContentChecker`] runs behind the authoring [`Canvas`] and
//! behind the validator when it replays existing page content.

pub mod canvas;
pub mod checker;
pub mod graphics_state;
pub mod operators;

pub use canvas::Canvas;
pub use checker::{ContentChecker, DEFAULT_MAX_FORM_DEPTH};
pub use graphics_state::{ExtGStateParams, GraphicsStateSnapshot, GraphicsStateTracker};
pub use operators::{parse_content, write_content, ContentOp};
