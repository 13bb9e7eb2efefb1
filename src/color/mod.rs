//! Color spaces, ICC profiles, output intents and color usage rules.

pub mod icc;
pub mod output_intent;
pub mod space;
pub mod usage;

pub use icc::{IccHeader, IccProfile};
pub use output_intent::OutputIntent;
pub use space::{ColorSpace, ColorSpaceFamily};
pub use usage::{ColorScope, ColorUsageChecker, DefaultColorSpaces};
