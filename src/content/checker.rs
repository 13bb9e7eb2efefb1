//! Routes content operators to the rule checks.
//!
//! [`ContentChecker`] is shared by the authoring canvas and by the
//! validator replaying existing streams. It owns nothing: the graphics
//! state tracker belongs to the canvas (or the replayed page) and the color
//! checker belongs to the document.

use super::graphics_state::GraphicsStateTracker;
use super::operators::{parse_content, ContentOp};
use crate::color::{ColorScope, ColorSpace, ColorSpaceFamily, ColorUsageChecker, DefaultColorSpaces, IccProfile, OutputIntent};
use crate::compliance::checker::StructureChecker;
use crate::compliance::profile::ProfileDescriptor;
use crate::compliance::violation::{RuleId, ViolationReporter};
use crate::error::{Error, Result};
use crate::object::{dict_name, Dictionary, Object};
use crate::store::ObjectStore;

/// Default nesting limit for form XObjects and pattern cells.
pub const DEFAULT_MAX_FORM_DEPTH: usize = 16;

/// Checks content operators against the active profile.
pub struct ContentChecker<'a> {
    descriptor: &'a ProfileDescriptor,
    store: &'a ObjectStore,
    structure: StructureChecker<'a>,
    reporter: ViolationReporter,
    colors: &'a mut ColorUsageChecker,
    tracker: &'a mut GraphicsStateTracker,
    output_intents: &'a [OutputIntent],
    blending_profile: Option<IccProfile>,
    form_depth: usize,
    max_form_depth: usize,
}

impl<'a> ContentChecker<'a> {
    /// Create a checker. `output_intents` are the intents in scope for the
    /// page being drawn.
    pub fn new(
        descriptor: &'a ProfileDescriptor,
        store: &'a ObjectStore,
        colors: &'a mut ColorUsageChecker,
        tracker: &'a mut GraphicsStateTracker,
        output_intents: &'a [OutputIntent],
    ) -> Self {
        Self {
            descriptor,
            store,
            structure: StructureChecker::new(descriptor, store),
            reporter: ViolationReporter::new(descriptor.level()),
            colors,
            tracker,
            output_intents,
            blending_profile: None,
            form_depth: 0,
            max_form_depth: DEFAULT_MAX_FORM_DEPTH,
        }
    }

    /// Set the ICC profile of the page group's blending color space.
    pub fn with_blending_profile(mut self, profile: Option<&IccProfile>) -> Self {
        self.blending_profile = profile.cloned();
        self
    }

    /// Set the form XObject nesting limit.
    pub fn with_max_form_depth(mut self, depth: usize) -> Self {
        self.max_form_depth = depth;
        self
    }

    /// Parse and check a whole content stream.
    pub fn replay(&mut self, content: &[u8], resources: &Dictionary) -> Result<()> {
        let ops = parse_content(content)?;
        log::debug!("Replaying {} content operators (form depth {})", ops.len(), self.form_depth);
        for op in &ops {
            self.check_op(op, resources)?;
        }
        Ok(())
    }

    /// Check one operator against `resources`, updating the tracked state.
    pub fn check_op(&mut self, op: &ContentOp, resources: &Dictionary) -> Result<()> {
        match op {
            ContentOp::SaveState => self.tracker.save_state(),
            ContentOp::RestoreState => self.tracker.restore_state(),
            ContentOp::SetFillColorSpace(name) => {
                let space = self.use_named_space(name, resources)?;
                self.tracker.set_fill_color_space(space);
                Ok(())
            },
            ContentOp::SetStrokeColorSpace(name) => {
                let space = self.use_named_space(name, resources)?;
                self.tracker.set_stroke_color_space(space);
                Ok(())
            },
            ContentOp::SetFillColor(operands) => {
                let space = self.tracker.current().fill_color_space.clone();
                self.use_color(&space, operands, resources)
            },
            ContentOp::SetStrokeColor(operands) => {
                let space = self.tracker.current().stroke_color_space.clone();
                self.use_color(&space, operands, resources)
            },
            ContentOp::SetFillGray(_) => self.use_device(ColorSpaceFamily::Gray, true, resources),
            ContentOp::SetStrokeGray(_) => self.use_device(ColorSpaceFamily::Gray, false, resources),
            ContentOp::SetFillRgb(..) => self.use_device(ColorSpaceFamily::Rgb, true, resources),
            ContentOp::SetStrokeRgb(..) => self.use_device(ColorSpaceFamily::Rgb, false, resources),
            ContentOp::SetFillCmyk(..) => self.use_device(ColorSpaceFamily::Cmyk, true, resources),
            ContentOp::SetStrokeCmyk(..) => self.use_device(ColorSpaceFamily::Cmyk, false, resources),
            ContentOp::SetExtGState(name) => {
                let gs = self.resource_dict("ExtGState", name, resources)?;
                let params = self.structure.check_ext_gstate(name, gs)?;
                self.tracker.apply_ext_gstate(&params);
                Ok(())
            },
            ContentOp::SetRenderingIntent(intent) => {
                self.structure.check_rendering_intent(intent)?;
                self.tracker.set_rendering_intent(intent.as_str());
                Ok(())
            },
            ContentOp::PaintXObject(name) => self.paint_xobject(name, resources),
            ContentOp::PaintShading(name) => {
                let shading = self.resource_dict("Shading", name, resources)?;
                self.check_shading(name, shading, resources)
            },
            ContentOp::SetFont { name, .. } => {
                let font = self.resource_dict("Font", name, resources)?;
                self.structure.check_font(name, font)
            },
            ContentOp::BeginText
            | ContentOp::EndText
            | ContentOp::ShowText(_)
            | ContentOp::ShowTextArray(_)
            | ContentOp::NextLineShowText(_)
            | ContentOp::SpacedShowText { .. }
            | ContentOp::Other { .. } => Ok(()),
        }
    }

    fn resource<'r>(&self, category: &str, name: &str, resources: &'r Dictionary) -> Result<&'r Object>
    where
        'a: 'r,
    {
        let store = self.store;
        store
            .entry_dict(resources, category)
            .and_then(|entries| store.entry(entries, name))
            .ok_or_else(|| Error::MissingResource {
                category: category.to_string(),
                name: name.to_string(),
            })
    }

    fn resource_dict<'r>(&self, category: &str, name: &str, resources: &'r Dictionary) -> Result<&'r Dictionary>
    where
        'a: 'r,
    {
        let object = self.resource(category, name, resources)?;
        object.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: format!("{} dictionary", category),
            found: object.type_name().to_string(),
        })
    }

    fn resolve_space(&self, object: &Object, resources: &Dictionary) -> Result<ColorSpace> {
        let store = self.store;
        let spaces = store.entry_dict(resources, "ColorSpace");
        ColorSpace::from_object(object, store, move |name| spaces.and_then(|d| store.entry(d, name)))
    }

    fn default_spaces(&self, resources: &Dictionary) -> Result<DefaultColorSpaces> {
        let store = self.store;
        let Some(spaces) = store.entry_dict(resources, "ColorSpace") else {
            return Ok(DefaultColorSpaces::default());
        };
        let lookup = |key: &str| -> Result<Option<ColorSpace>> {
            store
                .entry(spaces, key)
                .map(|space| self.resolve_space(space, resources))
                .transpose()
        };
        Ok(DefaultColorSpaces {
            gray: lookup("DefaultGray")?,
            rgb: lookup("DefaultRGB")?,
            cmyk: lookup("DefaultCMYK")?,
        })
    }

    fn check_space(&mut self, space: &ColorSpace, label: &str, resources: &Dictionary) -> Result<()> {
        let defaults = self.default_spaces(resources)?;
        let scope = ColorScope {
            output_intents: self.output_intents,
            defaults: &defaults,
            blending_profile: self.blending_profile.as_ref(),
        };
        self.colors.check_color_space(space, label, &scope)?;

        // A device space remapped by a default space paints in the default
        if let ColorSpace::Device(family) = space {
            if let Some(remapped) = defaults.for_family(*family) {
                if !matches!(remapped, ColorSpace::Device(_)) {
                    self.colors
                        .check_color_space(remapped, family.default_resource_name(), &scope)?;
                }
            }
        }
        Ok(())
    }

    fn use_named_space(&mut self, name: &str, resources: &Dictionary) -> Result<ColorSpace> {
        let space = self.resolve_space(&Object::name(name), resources)?;
        self.check_space(&space, name, resources)?;
        Ok(space)
    }

    fn use_device(&mut self, family: ColorSpaceFamily, fill: bool, resources: &Dictionary) -> Result<()> {
        let space = ColorSpace::Device(family);
        self.check_space(&space, family.device_name(), resources)?;
        if fill {
            self.tracker.set_fill_color_space(space);
        } else {
            self.tracker.set_stroke_color_space(space);
        }
        Ok(())
    }

    fn use_color(&mut self, space: &ColorSpace, operands: &[Object], resources: &Dictionary) -> Result<()> {
        match (space, operands.last().and_then(Object::as_name)) {
            (ColorSpace::Pattern(under), Some(pattern)) => {
                if let Some(under) = under {
                    self.check_space(under, "Pattern", resources)?;
                }
                self.check_pattern(pattern, resources)
            },
            _ => self.check_space(space, &space.label(), resources),
        }
    }

    fn check_pattern(&mut self, name: &str, resources: &Dictionary) -> Result<()> {
        let store = self.store;
        let pattern = self.resource("Pattern", name, resources)?;
        let Some(dict) = pattern.as_dict() else {
            return Ok(());
        };
        match store.entry(dict, "PatternType").and_then(Object::as_integer) {
            Some(1) => {
                let cell_resources = store.entry_dict(dict, "Resources").unwrap_or(resources);
                self.replay_nested(name, pattern, cell_resources, None)
            },
            Some(2) => {
                if let Some(gs) = store.entry_dict(dict, "ExtGState") {
                    let params = self.structure.check_ext_gstate(name, gs)?;
                    if params.introduces_transparency() {
                        self.tracker.mark_transparency();
                    }
                }
                match store.entry_dict(dict, "Shading") {
                    Some(shading) => self.check_shading(name, shading, resources),
                    None => Ok(()),
                }
            },
            _ => Ok(()),
        }
    }

    fn check_shading(&mut self, name: &str, shading: &Dictionary, resources: &Dictionary) -> Result<()> {
        match self.store.entry(shading, "ColorSpace") {
            Some(space) => {
                let space = self.resolve_space(space, resources)?;
                self.check_space(&space, name, resources)
            },
            None => Ok(()),
        }
    }

    fn paint_xobject(&mut self, name: &str, resources: &Dictionary) -> Result<()> {
        let store = self.store;
        let xobject = self.resource("XObject", name, resources)?;
        let dict = xobject.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "XObject stream".to_string(),
            found: xobject.type_name().to_string(),
        })?;

        match dict_name(dict, "Subtype") {
            Some("Image") => {
                self.structure.check_image(name, dict)?;
                let is_mask = store
                    .entry(dict, "ImageMask")
                    .and_then(Object::as_bool)
                    .unwrap_or(false);
                if !is_mask {
                    if let Some(space) = store.entry(dict, "ColorSpace") {
                        let space = self.resolve_space(space, resources)?;
                        self.check_space(&space, name, resources)?;
                    }
                }
                let soft_masked = store.entry(dict, "SMask").is_some_and(Object::is_stream)
                    || store
                        .entry(dict, "SMaskInData")
                        .and_then(Object::as_integer)
                        .is_some_and(|v| v > 0);
                if soft_masked {
                    self.reporter.ensure_with(
                        self.descriptor.allows_transparency(),
                        RuleId::TransparencyNotAllowed,
                        [format!("soft mask on image {}", name)],
                    )?;
                    self.tracker.mark_transparency();
                }
                Ok(())
            },
            Some("Form") => {
                self.structure.check_form(name, dict)?;
                if dict_name(dict, "Subtype2") == Some("PS") {
                    return Ok(());
                }
                let group_is_transparent = store
                    .entry_dict(dict, "Group")
                    .is_some_and(|group| dict_name(group, "S") == Some("Transparency"));
                if group_is_transparent {
                    self.tracker.mark_transparency();
                }
                let form_resources = store.entry_dict(dict, "Resources").unwrap_or(resources);
                let form_blending = group_blending_profile(store, dict);
                self.replay_nested(name, xobject, form_resources, form_blending)
            },
            Some("PS") => self.structure.check_form(name, dict),
            _ => Ok(()),
        }
    }

    /// Replay a form or pattern cell. A form group's own blending space
    /// replaces the enclosing one until the form ends.
    fn replay_nested(
        &mut self,
        name: &str,
        stream: &Object,
        resources: &Dictionary,
        blending: Option<IccProfile>,
    ) -> Result<()> {
        if self.form_depth >= self.max_form_depth {
            return Err(Error::InvalidPdf(format!(
                "{} nests content streams deeper than {}",
                name, self.max_form_depth
            )));
        }
        let content = stream.decode_stream_data()?;
        let checkpoint = self.tracker.enter_form();
        let outer_blending = match blending {
            Some(profile) => self.blending_profile.replace(profile),
            None => self.blending_profile.clone(),
        };
        self.form_depth += 1;
        let result = self.replay(&content, resources);
        self.form_depth -= 1;
        self.blending_profile = outer_blending;
        self.tracker.leave_form(checkpoint);
        result
    }
}

/// ICC profile of the blending color space of a transparency group
/// (page or form), if it has an ICCBased /CS.
pub fn group_blending_profile(store: &ObjectStore, owner: &Dictionary) -> Option<IccProfile> {
    let group = store.entry_dict(owner, "Group")?;
    let space = store.entry(group, "CS")?;
    match ColorSpace::from_object(space, store, |_| None).ok()? {
        ColorSpace::IccBased(profile) => Some(profile),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::icc::synthetic_profile;
    use crate::compliance::types::PdfALevel;

    struct Fixture {
        descriptor: ProfileDescriptor,
        store: ObjectStore,
        colors: ColorUsageChecker,
        tracker: GraphicsStateTracker,
        intents: Vec<OutputIntent>,
    }

    impl Fixture {
        fn new(level: PdfALevel) -> Self {
            let descriptor = ProfileDescriptor::for_level(level);
            Self {
                colors: ColorUsageChecker::new(&descriptor),
                tracker: GraphicsStateTracker::new(&descriptor),
                descriptor,
                store: ObjectStore::new(),
                intents: Vec::new(),
            }
        }

        fn with_rgb_intent(mut self) -> Self {
            let profile = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3);
            self.intents.push(OutputIntent::pdfa("sRGB", profile));
            self
        }

        fn run(&mut self, content: &[u8], resources: &Dictionary) -> Result<()> {
            ContentChecker::new(
                &self.descriptor,
                &self.store,
                &mut self.colors,
                &mut self.tracker,
                &self.intents,
            )
            .replay(content, resources)
        }
    }

    fn rule_of(result: Result<()>) -> Option<RuleId> {
        result.err().and_then(|e| e.violation().map(|v| v.rule()))
    }

    fn resources(entries: Vec<(&str, Object)>) -> Dictionary {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    mod color {
        use super::*;

        #[test]
        fn test_rgb_with_matching_intent() {
            let mut f = Fixture::new(PdfALevel::A2b).with_rgb_intent();
            assert!(f.run(b"1 0 0 rg 0 0 10 10 re f", &Dictionary::new()).is_ok());
        }

        #[test]
        fn test_cmyk_against_rgb_intent() {
            let mut f = Fixture::new(PdfALevel::A2b).with_rgb_intent();
            assert_eq!(
                rule_of(f.run(b"0 0 0 1 k", &Dictionary::new())),
                Some(RuleId::DeviceColorNotPermitted)
            );
        }

        #[test]
        fn test_default_space_permits_device_color() {
            let mut f = Fixture::new(PdfALevel::A1b);
            let icc = f.store.insert(Object::stream(
                [("N".to_string(), Object::Integer(4))].into_iter().collect(),
                synthetic_profile(b"CMYK", b"prtr", 2),
            ));
            let res = resources(vec![(
                "ColorSpace",
                Object::dict([("DefaultCMYK", Object::Array(vec![Object::name("ICCBased"), Object::Reference(icc)]))]),
            )]);
            assert!(f.run(b"0 0 0 1 K", &res).is_ok());
        }

        #[test]
        fn test_named_space_resolved_through_resources() {
            let mut f = Fixture::new(PdfALevel::A2b);
            let res = resources(vec![("ColorSpace", Object::dict([("CS0", Object::name("DeviceRGB"))]))]);
            assert_eq!(
                rule_of(f.run(b"/CS0 cs 1 0 0 sc", &res)),
                Some(RuleId::DeviceColorNotPermitted)
            );
        }

        #[test]
        fn test_missing_color_space_resource() {
            let mut f = Fixture::new(PdfALevel::A2b);
            let err = f.run(b"/CS9 CS", &Dictionary::new()).unwrap_err();
            assert!(matches!(err, Error::MissingResource { .. }));
        }
    }

    mod state {
        use super::*;

        #[test]
        fn test_nesting_limit_in_stream() {
            let mut f = Fixture::new(PdfALevel::A3b);
            let content = "q ".repeat(29);
            assert_eq!(
                rule_of(f.run(content.as_bytes(), &Dictionary::new())),
                Some(RuleId::GraphicsStateStackDepthExceeded)
            );
        }

        #[test]
        fn test_ext_gstate_transparency() {
            let mut f = Fixture::new(PdfALevel::A1b);
            let res = resources(vec![("ExtGState", Object::dict([("GS0", Object::dict([("CA", Object::Real(0.5))]))]))]);
            assert_eq!(rule_of(f.run(b"/GS0 gs", &res)), Some(RuleId::TransparencyNotAllowed));

            let mut f = Fixture::new(PdfALevel::A2b);
            f.run(b"/GS0 gs", &res).unwrap();
            assert!(f.tracker.uses_transparency());
        }

        #[test]
        fn test_rendering_intent_operator() {
            let mut f = Fixture::new(PdfALevel::A2b);
            assert_eq!(
                rule_of(f.run(b"/Vivid ri", &Dictionary::new())),
                Some(RuleId::RenderingIntentNotAllowed)
            );
        }
    }

    mod xobjects {
        use super::*;

        #[test]
        fn test_form_content_is_replayed() {
            let mut f = Fixture::new(PdfALevel::A2b).with_rgb_intent();
            let form_dict: Dictionary = [
                ("Type".to_string(), Object::name("XObject")),
                ("Subtype".to_string(), Object::name("Form")),
            ]
            .into_iter()
            .collect();
            let form = f.store.insert(Object::stream(form_dict, b"0 0 0 1 k".to_vec()));
            let res = resources(vec![("XObject", Object::dict([("Fm0", Object::Reference(form))]))]);
            assert_eq!(rule_of(f.run(b"/Fm0 Do", &res)), Some(RuleId::DeviceColorNotPermitted));
        }

        fn icc_space(store: &mut ObjectStore) -> Object {
            ColorSpace::IccBased(IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3)).to_object(store)
        }

        fn grouped_form(f: &mut Fixture, content: &[u8]) -> Dictionary {
            let group_space = icc_space(&mut f.store);
            let inner_space = icc_space(&mut f.store);
            let form_dict: Dictionary = [
                ("Subtype".to_string(), Object::name("Form")),
                (
                    "Group".to_string(),
                    Object::dict([("S", Object::name("Transparency")), ("CS", group_space)]),
                ),
                (
                    "Resources".to_string(),
                    Object::dict([("ColorSpace", Object::dict([("CS0", inner_space)]))]),
                ),
            ]
            .into_iter()
            .collect();
            let form = f.store.insert(Object::stream(form_dict, content.to_vec()));
            resources(vec![("XObject", Object::dict([("Fm0", Object::Reference(form))]))])
        }

        #[test]
        fn test_form_group_profile_applies_inside_form() {
            let mut f = Fixture::new(PdfALevel::A2b);
            let res = grouped_form(&mut f, b"/CS0 cs 1 0 0 sc");
            let err = f.run(b"/Fm0 Do", &res).unwrap_err();
            let violation = err.violation().unwrap();
            assert_eq!(violation.rule(), RuleId::DuplicateIccProfile);
            assert_eq!(violation.params(), ["CS0".to_string(), "transparency group".to_string()]);
        }

        #[test]
        fn test_form_group_profile_ends_with_form() {
            let mut f = Fixture::new(PdfALevel::A2b);
            let mut res = grouped_form(&mut f, b"0 0 1 1 re f");
            let page_space = icc_space(&mut f.store);
            res.insert("ColorSpace".to_string(), Object::dict([("CS0", page_space)]));
            assert!(f.run(b"/Fm0 Do /CS0 cs 1 0 0 sc", &res).is_ok());
        }

        #[test]
        fn test_self_referencing_form_is_cut_off() {
            let mut f = Fixture::new(PdfALevel::A2b);
            let form = f.store.reserve();
            let form_dict: Dictionary = [
                ("Subtype".to_string(), Object::name("Form")),
                ("Resources".to_string(), Object::dict([("XObject", Object::dict([("Me", Object::Reference(form))]))])),
            ]
            .into_iter()
            .collect();
            f.store.set(form, Object::stream(form_dict, b"/Me Do".to_vec()));
            let res = resources(vec![("XObject", Object::dict([("Me", Object::Reference(form))]))]);
            let err = f.run(b"/Me Do", &res).unwrap_err();
            assert!(matches!(err, Error::InvalidPdf(_)));
        }

        #[test]
        fn test_soft_masked_image() {
            let mut f = Fixture::new(PdfALevel::A1b).with_rgb_intent();
            let mask = f.store.insert(Object::stream(Dictionary::new(), vec![0u8; 4]));
            let image_dict: Dictionary = [
                ("Subtype".to_string(), Object::name("Image")),
                ("ColorSpace".to_string(), Object::name("DeviceRGB")),
                ("SMask".to_string(), Object::Reference(mask)),
            ]
            .into_iter()
            .collect();
            let image = f.store.insert(Object::stream(image_dict, vec![0u8; 12]));
            let res = resources(vec![("XObject", Object::dict([("Im0", Object::Reference(image))]))]);
            assert_eq!(rule_of(f.run(b"q /Im0 Do Q", &res)), Some(RuleId::TransparencyNotAllowed));
        }

        #[test]
        fn test_unembedded_font_via_tf() {
            let mut f = Fixture::new(PdfALevel::A2b);
            let font = f.store.insert(Object::dict([
                ("Type", Object::name("Font")),
                ("Subtype", Object::name("Type1")),
                ("BaseFont", Object::name("Helvetica")),
            ]));
            let res = resources(vec![("Font", Object::dict([("F1", Object::Reference(font))]))]);
            assert_eq!(
                rule_of(f.run(b"BT /F1 12 Tf (Hi) Tj ET", &res)),
                Some(RuleId::FontNotEmbedded)
            );
        }
    }
}
