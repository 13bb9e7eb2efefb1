//! Catalog, trailer and document-level checks.

use super::StructureChecker;
use crate::color::{ColorUsageChecker, OutputIntent};
use crate::compliance::types::{PdfAPart, PdfVersion};
use crate::compliance::violation::RuleId;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::xmp;
use std::collections::HashSet;

/// Device classes a PDF/A destination profile may declare.
const OUTPUT_DEVICE_CLASSES: &[&str] = &["prtr", "mntr"];

impl StructureChecker<'_> {
    pub(super) fn check_versions(&self, catalog: &Dictionary, header: PdfVersion) -> Result<()> {
        let d = self.descriptor;
        if !d.header_version_allowed(header) {
            let expected = format!("{} to {}", d.min_header_version, d.max_header_version);
            return self
                .reporter
                .raise_with(RuleId::HeaderVersionNotAllowed, [header.to_string(), expected]);
        }
        if d.catalog_version_must_match_header {
            if let Some(version) = self.store.entry(catalog, "Version").and_then(Object::as_name) {
                if PdfVersion::parse(version) != Some(header) {
                    return self
                        .reporter
                        .raise_with(RuleId::CatalogVersionMismatch, [version.to_string(), header.to_string()]);
                }
            }
        }
        Ok(())
    }

    pub(super) fn check_trailer(&self, trailer: &Dictionary) -> Result<()> {
        self.reporter
            .ensure(!trailer.contains_key("Encrypt"), RuleId::EncryptionNotAllowed)?;
        self.reporter
            .ensure(self.store.entry(trailer, "ID").is_some(), RuleId::TrailerIdMissing)
    }

    pub(super) fn check_object_count(&self) -> Result<()> {
        let count = self.store.len();
        let max = self.descriptor.max_indirect_objects;
        self.reporter.ensure_with(
            count <= max,
            RuleId::TooManyIndirectObjects,
            [count.to_string(), max.to_string()],
        )
    }

    pub(super) fn check_document_info(&self, catalog: &Dictionary, trailer: &Dictionary) -> Result<()> {
        if !self.descriptor.restrict_document_info || catalog.contains_key("PieceInfo") {
            return Ok(());
        }
        let Some(info) = self.store.entry_dict(trailer, "Info") else {
            return Ok(());
        };
        match info.keys().find(|key| key.as_str() != "ModDate") {
            Some(key) => self.reporter.raise_with(RuleId::DocumentInfoOnlyModDate, [key.as_str()]),
            None => Ok(()),
        }
    }

    pub(super) fn check_metadata(&self, catalog: &Dictionary) -> Result<()> {
        let Some(stream) = self.store.entry(catalog, "Metadata").filter(|o| o.is_stream()) else {
            return self.reporter.raise(RuleId::MetadataMissing);
        };
        let id = xmp::parse_identification(&stream.decode_stream_data()?)?;
        let level = self.descriptor.level();

        let Some(part) = id.part.as_deref() else {
            return self.reporter.raise_with(RuleId::XmpIdentificationMissing, ["part"]);
        };
        if part.trim() != level.xmp_part() {
            return self
                .reporter
                .raise_with(RuleId::XmpIdentificationMismatch, ["part", part, level.xmp_part()]);
        }

        let found = id.conformance.as_deref().map(str::trim);
        match (level.xmp_conformance(), found) {
            (Some(_), None) => {
                return self.reporter.raise_with(RuleId::XmpIdentificationMissing, ["conformance"]);
            },
            (Some(expected), Some(found)) if !found.eq_ignore_ascii_case(expected) => {
                return self
                    .reporter
                    .raise_with(RuleId::XmpIdentificationMismatch, ["conformance", found, expected]);
            },
            (None, Some(found)) => {
                return self
                    .reporter
                    .raise_with(RuleId::XmpIdentificationMismatch, ["conformance", found, "(none)"]);
            },
            _ => {},
        }

        if level.part() == PdfAPart::Part4 && id.rev.is_none() {
            return self.reporter.raise_with(RuleId::XmpIdentificationMissing, ["rev"]);
        }
        Ok(())
    }

    /// Check the PDF/A output intents of one scope (document or page).
    pub fn check_output_intents(&self, intents: &[OutputIntent]) -> Result<()> {
        let icc = ColorUsageChecker::new(self.descriptor);
        let mut first_profile = None;

        for intent in intents.iter().filter(|i| i.is_pdfa()) {
            let Some(profile) = &intent.profile else {
                return self.reporter.raise(RuleId::OutputIntentProfileMissing);
            };
            icc.check_icc_profile(profile)?;
            if let Some(header) = profile.header() {
                if !OUTPUT_DEVICE_CLASSES.contains(&header.device_class.as_str()) {
                    return self
                        .reporter
                        .raise_with(RuleId::OutputIntentDeviceClassNotAllowed, [header.device_class]);
                }
            }
            match first_profile {
                None => first_profile = Some(profile),
                Some(first) => {
                    self.reporter
                        .ensure(first.same_content(profile), RuleId::OutputIntentProfilesDiffer)?;
                },
            }
        }
        Ok(())
    }

    pub(super) fn check_catalog_entries(&self, catalog: &Dictionary) -> Result<()> {
        self.reporter.ensure(
            !catalog.contains_key("AlternatePresentations"),
            RuleId::AlternatePresentationsNotAllowed,
        )?;
        if let Some(names) = self.store.entry_dict(catalog, "Names") {
            self.reporter.ensure(
                !names.contains_key("AlternatePresentations"),
                RuleId::AlternatePresentationsNotAllowed,
            )?;
        }
        self.reporter
            .ensure(!catalog.contains_key("Requirements"), RuleId::RequirementsNotAllowed)
    }

    pub(super) fn check_acroform(&self, catalog: &Dictionary) -> Result<()> {
        let Some(form) = self.store.entry_dict(catalog, "AcroForm") else {
            return Ok(());
        };
        let need_appearances = self
            .store
            .entry(form, "NeedAppearances")
            .and_then(Object::as_bool)
            .unwrap_or(false);
        self.reporter
            .ensure(!need_appearances, RuleId::NeedAppearancesNotAllowed)?;
        self.reporter.ensure(!form.contains_key("XFA"), RuleId::XfaNotAllowed)
    }

    pub(super) fn check_optional_content(&self, catalog: &Dictionary) -> Result<()> {
        let Some(properties) = self.store.entry_dict(catalog, "OCProperties") else {
            return Ok(());
        };
        self.reporter.ensure(
            self.descriptor.optional_content_allowed,
            RuleId::OptionalContentNotAllowed,
        )?;

        let groups: Vec<ObjectRef> = self
            .store
            .entry_array(properties, "OCGs")
            .map(|items| items.iter().filter_map(Object::as_reference).collect())
            .unwrap_or_default();

        let mut configs: Vec<&Dictionary> = self.store.entry_dict(properties, "D").into_iter().collect();
        if let Some(items) = self.store.entry_array(properties, "Configs") {
            configs.extend(items.iter().filter_map(|o| self.store.resolve_dict(o)));
        }

        let mut names = HashSet::new();
        let mut ordered = HashSet::new();
        for config in configs {
            let Some(name) = super::entry_text(self.store, config, "Name") else {
                return self.reporter.raise(RuleId::OptionalContentConfigNameRequired);
            };
            if !names.insert(name.clone()) {
                return self
                    .reporter
                    .raise_with(RuleId::OptionalContentConfigNameNotUnique, [name]);
            }
            self.reporter.ensure(
                !config.contains_key("AS"),
                RuleId::OptionalContentConfigAsKeyNotAllowed,
            )?;
            if let Some(order) = self.store.entry(config, "Order") {
                self.collect_order(order, &mut ordered, 0);
            }
        }

        if let Some(unknown) = ordered.iter().find(|r| !groups.contains(r)) {
            return self
                .reporter
                .raise_with(RuleId::OptionalContentOrderUnknownGroup, [unknown.to_string()]);
        }
        if let Some(missing) = groups.iter().find(|r| !ordered.contains(r)) {
            return self
                .reporter
                .raise_with(RuleId::OptionalContentGroupNotInOrder, [missing.to_string()]);
        }
        Ok(())
    }

    // Order arrays nest: sub-arrays group entries, strings label them.
    fn collect_order(&self, order: &Object, out: &mut HashSet<ObjectRef>, depth: usize) {
        if depth > 32 {
            return;
        }
        match order {
            Object::Reference(r) => match self.store.get(*r) {
                Some(Object::Array(items)) => {
                    for item in items {
                        self.collect_order(item, out, depth + 1);
                    }
                },
                _ => {
                    out.insert(*r);
                },
            },
            Object::Array(items) => {
                for item in items {
                    self.collect_order(item, out, depth + 1);
                }
            },
            _ => {},
        }
    }

    pub(super) fn check_tagging(&self, catalog: &Dictionary) -> Result<()> {
        if !self.descriptor.requires_tagging {
            return Ok(());
        }
        let marked = self
            .store
            .entry_dict(catalog, "MarkInfo")
            .and_then(|info| self.store.entry(info, "Marked"))
            .and_then(Object::as_bool)
            .unwrap_or(false);
        self.reporter.ensure(marked, RuleId::MarkInfoRequired)?;
        self.reporter.ensure(
            self.store.entry(catalog, "StructTreeRoot").is_some(),
            RuleId::StructTreeRootRequired,
        )?;
        self.reporter
            .ensure(self.store.entry(catalog, "Lang").is_some(), RuleId::LanguageRequired)
    }
}
