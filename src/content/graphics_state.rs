//! Graphics state tracking for conformance checks.
//!
//! The tracker follows the parts of the graphics state that the rules look
//! at: nesting depth, color spaces, blend mode, soft mask, alpha and
//! rendering intent. Geometry and text state are not modeled.

use crate::color::ColorSpace;
use crate::compliance::profile::ProfileDescriptor;
use crate::compliance::violation::{RuleId, ViolationReporter};
use crate::error::Result;
use crate::object::{Dictionary, Object};
use crate::store::ObjectStore;

/// Blend modes defined by ISO 32000.
pub const STANDARD_BLEND_MODES: &[&str] = &[
    "Normal",
    "Compatible",
    "Multiply",
    "Screen",
    "Overlay",
    "Darken",
    "Lighten",
    "ColorDodge",
    "ColorBurn",
    "HardLight",
    "SoftLight",
    "Difference",
    "Exclusion",
    "Hue",
    "Saturation",
    "Color",
    "Luminosity",
];

/// The four standard rendering intents.
pub const STANDARD_RENDERING_INTENTS: &[&str] =
    &["RelativeColorimetric", "AbsoluteColorimetric", "Perceptual", "Saturation"];

/// The tracked subset of the graphics state.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsStateSnapshot {
    /// Nonstroking color space
    pub fill_color_space: ColorSpace,
    /// Stroking color space
    pub stroke_color_space: ColorSpace,
    /// Current blend mode
    pub blend_mode: String,
    /// Whether a soft mask is in effect
    pub soft_mask: bool,
    /// Nonstroking alpha (ca)
    pub fill_alpha: f64,
    /// Stroking alpha (CA)
    pub stroke_alpha: f64,
    /// Rendering intent
    pub rendering_intent: String,
}

impl Default for GraphicsStateSnapshot {
    fn default() -> Self {
        Self {
            fill_color_space: ColorSpace::GRAY,
            stroke_color_space: ColorSpace::GRAY,
            blend_mode: "Normal".to_string(),
            soft_mask: false,
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            rendering_intent: "RelativeColorimetric".to_string(),
        }
    }
}

impl GraphicsStateSnapshot {
    /// Whether painting with this state composites transparently.
    pub fn is_transparent(&self) -> bool {
        self.soft_mask
            || self.fill_alpha < 1.0
            || self.stroke_alpha < 1.0
            || !matches!(self.blend_mode.as_str(), "Normal" | "Compatible")
    }
}

/// Parameters of an ExtGState dictionary that the rules inspect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtGStateParams {
    /// BM, a name or an array of names
    pub blend_modes: Vec<String>,
    /// SMask present and not /None
    pub soft_mask: Option<bool>,
    /// ca
    pub fill_alpha: Option<f64>,
    /// CA
    pub stroke_alpha: Option<f64>,
    /// RI
    pub rendering_intent: Option<String>,
    /// TR present
    pub has_transfer_function: bool,
    /// TR2 as a name, or "function" for anything else
    pub transfer_function_2: Option<String>,
    /// HTO present
    pub has_halftone_origin: bool,
}

impl ExtGStateParams {
    /// Read the checked keys from an ExtGState dictionary.
    pub fn from_dict(dict: &Dictionary, store: &ObjectStore) -> Self {
        let blend_modes = match store.entry(dict, "BM") {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(items)) => items
                .iter()
                .filter_map(|o| store.resolve(o).as_name())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        let soft_mask = store
            .entry(dict, "SMask")
            .map(|mask| mask.as_name() != Some("None"));

        Self {
            blend_modes,
            soft_mask,
            fill_alpha: store.entry(dict, "ca").and_then(Object::as_number),
            stroke_alpha: store.entry(dict, "CA").and_then(Object::as_number),
            rendering_intent: store
                .entry(dict, "RI")
                .and_then(Object::as_name)
                .map(str::to_string),
            has_transfer_function: dict.contains_key("TR"),
            transfer_function_2: store.entry(dict, "TR2").map(|tr2| {
                tr2.as_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "function".to_string())
            }),
            has_halftone_origin: dict.contains_key("HTO"),
        }
    }

    /// Whether these parameters introduce transparency.
    pub fn introduces_transparency(&self) -> bool {
        self.soft_mask == Some(true)
            || self.fill_alpha.is_some_and(|a| a < 1.0)
            || self.stroke_alpha.is_some_and(|a| a < 1.0)
            || self
                .blend_modes
                .iter()
                .any(|bm| !matches!(bm.as_str(), "Normal" | "Compatible"))
    }
}

/// State put aside while a form XObject or pattern cell is replayed.
#[derive(Debug, Clone)]
pub struct FormCheckpoint {
    depth: usize,
    floor: usize,
    snapshot: GraphicsStateSnapshot,
}

/// Canvas-scoped graphics state machine.
#[derive(Debug, Clone)]
pub struct GraphicsStateTracker {
    reporter: ViolationReporter,
    max_depth: usize,
    current: GraphicsStateSnapshot,
    stack: Vec<GraphicsStateSnapshot>,
    // Saves below this depth belong to an enclosing stream
    floor: usize,
    uses_transparency: bool,
}

impl GraphicsStateTracker {
    /// Create a tracker with the profile's depth limit.
    pub fn new(descriptor: &ProfileDescriptor) -> Self {
        Self {
            reporter: ViolationReporter::new(descriptor.level()),
            max_depth: descriptor.max_graphics_state_depth,
            current: GraphicsStateSnapshot::default(),
            stack: Vec::new(),
            floor: 0,
            uses_transparency: false,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The current state.
    pub fn current(&self) -> &GraphicsStateSnapshot {
        &self.current
    }

    /// Push the current state (q). Fails on the save that would exceed
    /// the limit; the stack is left unchanged.
    pub fn save_state(&mut self) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return self
                .reporter
                .raise_with(RuleId::GraphicsStateStackDepthExceeded, [self.max_depth.to_string()]);
        }
        self.stack.push(self.current.clone());
        Ok(())
    }

    /// Pop the saved state (Q). Inside a replayed form only the form's own
    /// saves can be restored.
    pub fn restore_state(&mut self) -> Result<()> {
        if self.stack.len() <= self.floor {
            return self.reporter.raise(RuleId::UnbalancedRestoreState);
        }
        match self.stack.pop() {
            Some(saved) => {
                self.current = saved;
                Ok(())
            },
            None => self.reporter.raise(RuleId::UnbalancedRestoreState),
        }
    }

    /// Start replaying a nested stream. Saves made inside it still count
    /// toward the depth limit.
    pub fn enter_form(&mut self) -> FormCheckpoint {
        let checkpoint = FormCheckpoint {
            depth: self.stack.len(),
            floor: self.floor,
            snapshot: self.current.clone(),
        };
        self.floor = self.stack.len();
        checkpoint
    }

    /// Finish a nested stream: saves it left open are dropped and the
    /// caller's state comes back.
    pub fn leave_form(&mut self, checkpoint: FormCheckpoint) {
        self.stack.truncate(checkpoint.depth);
        self.floor = checkpoint.floor;
        self.current = checkpoint.snapshot;
    }

    /// Set the nonstroking color space.
    pub fn set_fill_color_space(&mut self, space: ColorSpace) {
        self.current.fill_color_space = space;
    }

    /// Set the stroking color space.
    pub fn set_stroke_color_space(&mut self, space: ColorSpace) {
        self.current.stroke_color_space = space;
    }

    /// Set the rendering intent.
    pub fn set_rendering_intent(&mut self, intent: impl Into<String>) {
        self.current.rendering_intent = intent.into();
    }

    /// Apply a checked ExtGState.
    pub fn apply_ext_gstate(&mut self, params: &ExtGStateParams) {
        // The first mode the consumer recognizes wins; every listed mode
        // has been checked, so the first one is used
        if let Some(mode) = params.blend_modes.first() {
            self.current.blend_mode = mode.clone();
        }
        if let Some(soft_mask) = params.soft_mask {
            self.current.soft_mask = soft_mask;
        }
        if let Some(alpha) = params.fill_alpha {
            self.current.fill_alpha = alpha;
        }
        if let Some(alpha) = params.stroke_alpha {
            self.current.stroke_alpha = alpha;
        }
        if let Some(intent) = &params.rendering_intent {
            self.current.rendering_intent = intent.clone();
        }
        if params.introduces_transparency() {
            self.uses_transparency = true;
        }
    }

    /// Record transparency introduced outside the graphics state, such as
    /// a soft-masked image.
    pub fn mark_transparency(&mut self) {
        self.uses_transparency = true;
    }

    /// Whether anything drawn so far used transparency.
    pub fn uses_transparency(&self) -> bool {
        self.uses_transparency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::types::PdfALevel;

    fn tracker() -> GraphicsStateTracker {
        GraphicsStateTracker::new(&ProfileDescriptor::for_level(PdfALevel::A2b))
    }

    mod stack {
        use super::*;

        #[test]
        fn test_depth_limit_is_inclusive() {
            let mut t = tracker();
            for _ in 0..28 {
                t.save_state().unwrap();
            }
            assert_eq!(t.depth(), 28);
            let err = t.save_state().unwrap_err();
            let violation = err.violation().unwrap();
            assert_eq!(violation.rule(), RuleId::GraphicsStateStackDepthExceeded);
            assert_eq!(violation.params(), ["28".to_string()]);
            assert_eq!(t.depth(), 28);
        }

        #[test]
        fn test_unbalanced_restore() {
            let mut t = tracker();
            let err = t.restore_state().unwrap_err();
            assert_eq!(err.violation().unwrap().rule(), RuleId::UnbalancedRestoreState);
        }

        #[test]
        fn test_restore_brings_back_saved_color_space() {
            let mut t = tracker();
            t.set_fill_color_space(ColorSpace::CMYK);
            t.save_state().unwrap();
            t.set_fill_color_space(ColorSpace::RGB);
            t.restore_state().unwrap();
            assert_eq!(t.current().fill_color_space, ColorSpace::CMYK);
        }

        #[test]
        fn test_form_cannot_restore_caller_state() {
            let mut t = tracker();
            t.save_state().unwrap();
            t.set_fill_color_space(ColorSpace::RGB);
            let checkpoint = t.enter_form();
            assert!(t.restore_state().unwrap_err().is_conformance());
            t.save_state().unwrap();
            t.set_fill_color_space(ColorSpace::CMYK);
            t.leave_form(checkpoint);
            assert_eq!(t.depth(), 1);
            assert_eq!(t.current().fill_color_space, ColorSpace::RGB);
            t.restore_state().unwrap();
        }
    }

    mod ext_gstate {
        use super::*;

        #[test]
        fn test_params_from_dict() {
            let store = ObjectStore::new();
            let dict = Object::dict([
                ("BM", Object::Array(vec![Object::name("Multiply"), Object::name("Normal")])),
                ("SMask", Object::name("None")),
                ("ca", Object::Real(0.5)),
                ("TR2", Object::name("Default")),
            ]);
            let params = ExtGStateParams::from_dict(dict.as_dict().unwrap(), &store);
            assert_eq!(params.blend_modes, vec!["Multiply", "Normal"]);
            assert_eq!(params.soft_mask, Some(false));
            assert_eq!(params.fill_alpha, Some(0.5));
            assert_eq!(params.transfer_function_2.as_deref(), Some("Default"));
            assert!(!params.has_transfer_function);
            assert!(params.introduces_transparency());
        }

        #[test]
        fn test_apply_marks_transparency() {
            let mut t = tracker();
            t.apply_ext_gstate(&ExtGStateParams {
                stroke_alpha: Some(0.25),
                ..Default::default()
            });
            assert!(t.uses_transparency());
            assert!(t.current().is_transparent());
        }

        #[test]
        fn test_opaque_params_do_not_mark_transparency() {
            let mut t = tracker();
            t.apply_ext_gstate(&ExtGStateParams {
                blend_modes: vec!["Compatible".to_string()],
                fill_alpha: Some(1.0),
                rendering_intent: Some("Perceptual".to_string()),
                ..Default::default()
            });
            assert!(!t.uses_transparency());
            assert_eq!(t.current().rendering_intent, "Perceptual");
        }
    }
}
