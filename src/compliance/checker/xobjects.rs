//! Image, form XObject and ExtGState checks.

use super::StructureChecker;
use crate::compliance::violation::RuleId;
use crate::content::graphics_state::{ExtGStateParams, STANDARD_BLEND_MODES, STANDARD_RENDERING_INTENTS};
use crate::error::Result;
use crate::object::{dict_name, filter_names, Dictionary, Object};

impl StructureChecker<'_> {
    /// Check an image XObject dictionary.
    pub fn check_image(&self, name: &str, image: &Dictionary) -> Result<()> {
        self.check_filters(image)?;
        let interpolate = self
            .store
            .entry(image, "Interpolate")
            .and_then(Object::as_bool)
            .unwrap_or(false);
        self.reporter
            .ensure_with(!interpolate, RuleId::ImageInterpolationNotAllowed, [name])?;
        self.reporter
            .ensure_with(!image.contains_key("Alternates"), RuleId::ImageAlternatesNotAllowed, [name])?;
        self.reporter
            .ensure_with(!image.contains_key("OPI"), RuleId::OpiNotAllowed, [name])
    }

    /// Check a form XObject dictionary. Its content is checked separately.
    pub fn check_form(&self, name: &str, form: &Dictionary) -> Result<()> {
        let postscript = dict_name(form, "Subtype") == Some("PS")
            || dict_name(form, "Subtype2") == Some("PS")
            || form.contains_key("PS");
        self.reporter
            .ensure_with(!postscript, RuleId::PostScriptXObjectNotAllowed, [name])?;
        self.reporter
            .ensure_with(!form.contains_key("Ref"), RuleId::ReferenceXObjectNotAllowed, [name])?;
        self.reporter
            .ensure_with(!form.contains_key("OPI"), RuleId::OpiNotAllowed, [name])?;
        self.check_filters(form)?;

        if !self.descriptor.allows_transparency() && self.is_transparency_group(form) {
            return self
                .reporter
                .raise_with(RuleId::TransparencyNotAllowed, [format!("transparency group in {}", name)]);
        }
        Ok(())
    }

    /// Check an ExtGState dictionary and return the parameters the
    /// tracker applies.
    pub fn check_ext_gstate(&self, name: &str, gs: &Dictionary) -> Result<ExtGStateParams> {
        let params = ExtGStateParams::from_dict(gs, self.store);

        self.reporter
            .ensure(!params.has_transfer_function, RuleId::TransferFunctionNotAllowed)?;
        if let Some(tr2) = &params.transfer_function_2 {
            self.reporter
                .ensure_with(tr2 == "Default", RuleId::TransferFunction2NotAllowed, [tr2])?;
        }
        if self.descriptor.halftone_origin_forbidden {
            self.reporter
                .ensure(!params.has_halftone_origin, RuleId::HalftoneOriginNotAllowed)?;
        }
        if let Some(intent) = &params.rendering_intent {
            self.check_rendering_intent(intent)?;
        }

        if self.descriptor.allows_transparency() {
            if let Some(mode) = params
                .blend_modes
                .iter()
                .find(|bm| !STANDARD_BLEND_MODES.contains(&bm.as_str()))
            {
                return self.reporter.raise_with(RuleId::BlendModeNotAllowed, [mode]);
            }
        } else {
            if let Some(mode) = params
                .blend_modes
                .iter()
                .find(|bm| !matches!(bm.as_str(), "Normal" | "Compatible"))
            {
                return self.reporter.raise_with(RuleId::BlendModeNotAllowed, [mode]);
            }
            if params.soft_mask == Some(true) {
                return self
                    .reporter
                    .raise_with(RuleId::TransparencyNotAllowed, [format!("soft mask in {}", name)]);
            }
            for (key, alpha) in [("ca", params.fill_alpha), ("CA", params.stroke_alpha)] {
                if let Some(alpha) = alpha.filter(|a| *a != 1.0) {
                    return self
                        .reporter
                        .raise_with(RuleId::TransparencyNotAllowed, [format!("{} {} in {}", key, alpha, name)]);
                }
            }
        }
        Ok(params)
    }

    /// Check a rendering intent name, from `ri` or an ExtGState.
    pub fn check_rendering_intent(&self, intent: &str) -> Result<()> {
        self.reporter.ensure_with(
            STANDARD_RENDERING_INTENTS.contains(&intent),
            RuleId::RenderingIntentNotAllowed,
            [intent],
        )
    }

    /// Whether a dictionary carries a /Group with /S /Transparency.
    pub(super) fn is_transparency_group(&self, dict: &Dictionary) -> bool {
        self.store
            .entry_dict(dict, "Group")
            .and_then(|group| dict_name(group, "S"))
            == Some("Transparency")
    }

    fn check_filters(&self, dict: &Dictionary) -> Result<()> {
        let Some(filter) = self.store.entry(dict, "Filter") else {
            return Ok(());
        };
        for filter in filter_names(self.store.resolve(filter)) {
            let allowed = match filter.as_str() {
                "LZWDecode" | "LZW" => false,
                "JPXDecode" => self.descriptor.jpeg2000_allowed,
                _ => true,
            };
            self.reporter
                .ensure_with(allowed, RuleId::FilterNotAllowed, [filter.as_str()])?;
        }
        Ok(())
    }
}
