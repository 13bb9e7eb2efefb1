//! Annotation checks.

use super::StructureChecker;
use crate::annotation_types::{AnnotationFlags, AnnotationSubtype};
use crate::compliance::rules::ActionContext;
use crate::compliance::violation::RuleId;
use crate::error::Result;
use crate::object::{Dictionary, Object};

/// Parent chains longer than this are treated as broken.
const MAX_FIELD_DEPTH: usize = 32;

impl StructureChecker<'_> {
    /// Check one annotation dictionary and the actions it carries.
    pub fn check_annotation(&self, annot: &Dictionary) -> Result<()> {
        let rules = self.descriptor.annotation_rules();
        let subtype_name = self
            .store
            .entry(annot, "Subtype")
            .and_then(Object::as_name)
            .unwrap_or("(none)");
        let subtype = AnnotationSubtype::from_pdf_name(subtype_name);

        if !rules.is_subtype_allowed(subtype) {
            return self
                .reporter
                .raise_with(RuleId::AnnotationTypeNotAllowed, [subtype_name]);
        }

        let flags = AnnotationFlags::from_value(
            self.store
                .entry(annot, "F")
                .and_then(Object::as_integer)
                .unwrap_or(0),
        );
        if rules.requires_print_flag(subtype) && !flags.contains(AnnotationFlags::PRINT) {
            return self
                .reporter
                .raise_with(RuleId::AnnotationPrintFlagRequired, [subtype_name]);
        }
        if let Some(flag) = rules.forbidden_flags().find(|f| flags.contains(*f)) {
            return self.reporter.raise_with(
                RuleId::AnnotationFlagNotAllowed,
                [subtype_name, AnnotationFlags::flag_name(flag)],
            );
        }

        if rules.opacity_restricted() {
            if let Some(ca) = self.store.entry(annot, "CA").and_then(Object::as_number) {
                if ca != 1.0 {
                    return self.reporter.raise_with(
                        RuleId::AnnotationOpacityNotAllowed,
                        [subtype_name.to_string(), ca.to_string()],
                    );
                }
            }
        }

        let has_normal_appearance = self.check_appearance(annot, subtype, subtype_name)?;
        if !has_normal_appearance {
            if rules.requires_appearance(subtype, self.is_zero_area(annot)) {
                return self
                    .reporter
                    .raise_with(RuleId::AnnotationAppearanceMissing, [subtype_name]);
            }
            if rules.requires_contents(subtype) && !annot.contains_key("Contents") {
                return self
                    .reporter
                    .raise_with(RuleId::AnnotationContentsRequired, [subtype_name]);
            }
        }

        if subtype == AnnotationSubtype::Widget {
            self.check_widget_actions(annot)?;
        } else if let Some(action) = self.store.entry_dict(annot, "A") {
            self.check_action(ActionContext::Annotation, action)?;
        }
        if let Some(aa) = self.store.entry_dict(annot, "AA") {
            self.check_additional_actions(ActionContext::Annotation, aa)?;
        }
        Ok(())
    }

    /// Shape of /AP. Returns whether a normal appearance exists.
    fn check_appearance(&self, annot: &Dictionary, subtype: AnnotationSubtype, subtype_name: &str) -> Result<bool> {
        let Some(ap) = self.store.entry_dict(annot, "AP") else {
            return Ok(false);
        };
        if let Some(key) = ap.keys().find(|k| k.as_str() != "N") {
            return self.reporter.raise_with(
                RuleId::AppearanceDictionaryOnlyNormal,
                [subtype_name, key.as_str()],
            );
        }
        let Some(normal) = self.store.entry(ap, "N") else {
            return Ok(false);
        };

        if subtype == AnnotationSubtype::Widget && self.is_button_field(annot) {
            if normal.is_stream() || normal.as_dict().is_none() {
                return self
                    .reporter
                    .raise(RuleId::ButtonAppearanceNormalShallBeStateDictionary);
            }
        } else if !normal.is_stream() {
            return self
                .reporter
                .raise_with(RuleId::AppearanceNormalShallBeStream, [subtype_name]);
        }
        Ok(true)
    }

    /// Whether FT, possibly inherited through /Parent, is Btn.
    fn is_button_field(&self, widget: &Dictionary) -> bool {
        let mut current = Some(widget);
        for _ in 0..MAX_FIELD_DEPTH {
            let Some(dict) = current else {
                return false;
            };
            if let Some(ft) = self.store.entry(dict, "FT").and_then(Object::as_name) {
                return ft == "Btn";
            }
            current = self.store.entry_dict(dict, "Parent");
        }
        false
    }

    fn is_zero_area(&self, annot: &Dictionary) -> bool {
        let rect: Vec<f64> = self
            .store
            .entry_array(annot, "Rect")
            .map(|r| r.iter().filter_map(|v| self.store.resolve(v).as_number()).collect())
            .unwrap_or_default();
        match rect.as_slice() {
            [x1, y1, x2, y2] => (x2 - x1).abs() == 0.0 || (y2 - y1).abs() == 0.0,
            _ => false,
        }
    }

    /// Widgets and the fields they belong to must not carry /A.
    fn check_widget_actions(&self, widget: &Dictionary) -> Result<()> {
        let mut current = Some(widget);
        for _ in 0..MAX_FIELD_DEPTH {
            let Some(dict) = current else {
                break;
            };
            self.reporter
                .ensure(!dict.contains_key("A"), RuleId::WidgetActionNotAllowed)?;
            current = self.store.entry_dict(dict, "Parent");
        }
        Ok(())
    }
}
