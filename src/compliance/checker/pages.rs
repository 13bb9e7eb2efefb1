//! Per-page checks of the deferred pass.

use super::{PageRecord, StructureChecker};
use crate::color::OutputIntent;
use crate::compliance::rules::ActionContext;
use crate::compliance::violation::RuleId;
use crate::error::{Error, Result};
use crate::object::{dict_name, Dictionary};
use crate::store::ObjectStore;

impl StructureChecker<'_> {
    /// Check one page: its AA, annotations, resources, transparency group
    /// and page-level output intents. `index` is zero-based.
    pub fn check_page(&self, index: usize, page: &PageRecord, document_intents: &[OutputIntent]) -> Result<()> {
        let object = self.store.fetch(page.reference)?;
        let dict = object.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: object.type_name().to_string(),
        })?;

        if let Some(aa) = self.store.entry_dict(dict, "AA") {
            self.check_additional_actions(ActionContext::PageAdditionalActions, aa)?;
        }

        if let Some(annots) = self.store.entry_array(dict, "Annots") {
            for annot in annots.iter().filter_map(|a| self.store.resolve_dict(a)) {
                self.check_annotation(annot)?;
            }
        }

        if let Some(resources) = inherited_resources(self.store, dict) {
            self.check_page_resources(resources)?;
        }

        if !page.output_intents.is_empty() {
            self.check_output_intents(&page.output_intents)?;
        }
        self.check_page_group(index, dict, page, document_intents)
    }

    /// Fonts, ExtGStates and XObjects bound to a page, whether or not its
    /// content uses them.
    fn check_page_resources(&self, resources: &Dictionary) -> Result<()> {
        for (name, font) in bound_dicts(self.store, resources, "Font") {
            self.check_font(name, font)?;
        }
        for (name, gs) in bound_dicts(self.store, resources, "ExtGState") {
            self.check_ext_gstate(name, gs)?;
        }
        for (name, xobject) in bound_dicts(self.store, resources, "XObject") {
            match dict_name(xobject, "Subtype") {
                Some("Image") => self.check_image(name, xobject)?,
                Some("Form") | Some("PS") => self.check_form(name, xobject)?,
                _ => {},
            }
        }
        Ok(())
    }

    fn check_page_group(
        &self,
        index: usize,
        dict: &Dictionary,
        page: &PageRecord,
        document_intents: &[OutputIntent],
    ) -> Result<()> {
        let is_group = self.is_transparency_group(dict);
        if !self.descriptor.allows_transparency() {
            return self.reporter.ensure_with(
                !is_group,
                RuleId::TransparencyNotAllowed,
                [format!("transparency group on page {}", index + 1)],
            );
        }
        if !page.uses_transparency {
            return Ok(());
        }

        let has_intent = page
            .effective_intents(document_intents)
            .iter()
            .any(OutputIntent::is_pdfa);
        let group_has_space = is_group
            && self
                .store
                .entry_dict(dict, "Group")
                .is_some_and(|group| self.store.entry(group, "CS").is_some());
        self.reporter.ensure_with(
            has_intent || group_has_space,
            RuleId::PageTransparencyGroupRequired,
            [(index + 1).to_string()],
        )
    }
}

/// Named dictionaries (or streams) in one resource category.
fn bound_dicts<'s>(
    store: &'s ObjectStore,
    resources: &'s Dictionary,
    category: &str,
) -> impl Iterator<Item = (&'s String, &'s Dictionary)> + 's {
    store
        .entry_dict(resources, category)
        .into_iter()
        .flatten()
        .filter_map(move |(name, value)| store.resolve_dict(value).map(|dict| (name, dict)))
}

/// Resources of a page, following /Parent for inherited entries.
pub(crate) fn inherited_resources<'a>(store: &'a ObjectStore, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut current = Some(page);
    for _ in 0..super::MAX_ACTION_CHAIN {
        let dict = current?;
        if let Some(resources) = store.entry_dict(dict, "Resources") {
            return Some(resources);
        }
        current = store.entry_dict(dict, "Parent");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::color::icc::synthetic_profile;
    use crate::color::IccProfile;
    use crate::compliance::types::PdfALevel;
    use crate::object::{Object, ObjectRef};

    fn rule_of(result: Result<()>) -> Option<RuleId> {
        result.err().and_then(|e| e.violation().map(|v| v.rule()))
    }

    fn page(store: &mut ObjectStore, entries: Vec<(&str, Object)>) -> ObjectRef {
        let mut dict: Dictionary = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        dict.insert("Type".to_string(), Object::name("Page"));
        store.insert(Object::Dictionary(dict))
    }

    fn cmyk_intent() -> OutputIntent {
        OutputIntent::pdfa("FOGRA39", IccProfile::new(synthetic_profile(b"CMYK", b"prtr", 2), 4))
    }

    #[test]
    fn test_page_aa_in_part2() {
        let (mut store, _) = minimal_store();
        let r = page(&mut store, vec![("AA", Object::Dictionary(Dictionary::new()))]);
        let d = descriptor(PdfALevel::A2b);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_page(0, &PageRecord::new(r), &[])),
            Some(RuleId::PageAdditionalActionsNotAllowed)
        );
    }

    #[test]
    fn test_annotations_are_checked() {
        let (mut store, _) = minimal_store();
        let annot = store.insert(Object::dict([
            ("Type", Object::name("Annot")),
            ("Subtype", Object::name("Text")),
            ("Rect", Object::numbers(&[0.0, 0.0, 20.0, 20.0])),
        ]));
        let r = page(&mut store, vec![("Annots", Object::Array(vec![Object::Reference(annot)]))]);
        let d = descriptor(PdfALevel::A1b);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_page(0, &PageRecord::new(r), &[])),
            Some(RuleId::AnnotationPrintFlagRequired)
        );
    }

    #[test]
    fn test_resource_fonts_are_checked() {
        let (mut store, _) = minimal_store();
        let font = store.insert(Object::dict([
            ("Type", Object::name("Font")),
            ("Subtype", Object::name("Type1")),
            ("BaseFont", Object::name("Helvetica")),
        ]));
        let resources = Object::dict([("Font", Object::dict([("F1", Object::Reference(font))]))]);
        let r = page(&mut store, vec![("Resources", resources)]);
        let d = descriptor(PdfALevel::A2b);
        let err = StructureChecker::new(&d, &store)
            .check_page(0, &PageRecord::new(r), &[])
            .unwrap_err();
        let v = err.violation().unwrap();
        assert_eq!(v.rule(), RuleId::FontNotEmbedded);
        assert_eq!(v.params(), ["F1".to_string()]);
    }

    #[test]
    fn test_unused_ext_gstate_is_checked() {
        let (mut store, _) = minimal_store();
        let gs = store.insert(Object::dict([
            ("Type", Object::name("ExtGState")),
            ("TR", Object::name("Identity")),
        ]));
        let resources = Object::dict([("ExtGState", Object::dict([("GS0", Object::Reference(gs))]))]);
        let r = page(&mut store, vec![("Resources", resources)]);
        let d = descriptor(PdfALevel::A2b);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_page(0, &PageRecord::new(r), &[])),
            Some(RuleId::TransferFunctionNotAllowed)
        );
    }

    #[test]
    fn test_unused_image_is_checked() {
        let (mut store, _) = minimal_store();
        let image_dict: Dictionary = [
            ("Subtype".to_string(), Object::name("Image")),
            ("Alternates".to_string(), Object::Array(Vec::new())),
        ]
        .into_iter()
        .collect();
        let image = store.insert(Object::stream(image_dict, vec![0u8; 3]));
        let resources = Object::dict([("XObject", Object::dict([("Im0", Object::Reference(image))]))]);
        let r = page(&mut store, vec![("Resources", resources)]);
        let d = descriptor(PdfALevel::A3b);
        let err = StructureChecker::new(&d, &store)
            .check_page(0, &PageRecord::new(r), &[])
            .unwrap_err();
        let v = err.violation().unwrap();
        assert_eq!(v.rule(), RuleId::ImageAlternatesNotAllowed);
        assert_eq!(v.params(), ["Im0".to_string()]);
    }

    mod transparency {
        use super::*;

        fn transparent_page(store: &mut ObjectStore, group: Option<Object>) -> PageRecord {
            let entries = group.map(|g| vec![("Group", g)]).unwrap_or_default();
            let mut record = PageRecord::new(page(store, entries));
            record.uses_transparency = true;
            record
        }

        #[test]
        fn test_group_required_without_intent() {
            let (mut store, _) = minimal_store();
            let record = transparent_page(&mut store, None);
            let d = descriptor(PdfALevel::A2b);
            let err = StructureChecker::new(&d, &store)
                .check_page(2, &record, &[])
                .unwrap_err();
            let v = err.violation().unwrap();
            assert_eq!(v.rule(), RuleId::PageTransparencyGroupRequired);
            assert_eq!(v.params(), ["3".to_string()]);
        }

        #[test]
        fn test_document_intent_satisfies_group_rule() {
            let (mut store, _) = minimal_store();
            let record = transparent_page(&mut store, None);
            let d = descriptor(PdfALevel::A2b);
            assert!(StructureChecker::new(&d, &store)
                .check_page(0, &record, &[cmyk_intent()])
                .is_ok());
        }

        #[test]
        fn test_group_with_color_space_satisfies_rule() {
            let (mut store, _) = minimal_store();
            let group = Object::dict([("S", Object::name("Transparency")), ("CS", Object::name("DeviceRGB"))]);
            let record = transparent_page(&mut store, Some(group));
            let d = descriptor(PdfALevel::A3u);
            assert!(StructureChecker::new(&d, &store).check_page(0, &record, &[]).is_ok());
        }

        #[test]
        fn test_part1_page_group_forbidden() {
            let (mut store, _) = minimal_store();
            let r = page(&mut store, vec![("Group", Object::dict([("S", Object::name("Transparency"))]))]);
            let d = descriptor(PdfALevel::A1b);
            assert_eq!(
                rule_of(StructureChecker::new(&d, &store).check_page(0, &PageRecord::new(r), &[])),
                Some(RuleId::TransparencyNotAllowed)
            );
        }
    }

    #[test]
    fn test_resources_inherited_from_parent() {
        let (mut store, _) = minimal_store();
        let parent = store.insert(Object::dict([(
            "Resources",
            Object::dict([("ProcSet", Object::Array(vec![Object::name("PDF")]))]),
        )]));
        let child: Dictionary = [("Parent".to_string(), Object::Reference(parent))].into_iter().collect();
        let resources = inherited_resources(&store, &child).unwrap();
        assert!(resources.contains_key("ProcSet"));
    }
}
