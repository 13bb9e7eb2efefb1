//! Embedded file and file specification checks.

use super::{entry_text, StructureChecker};
use crate::compliance::rules::EmbeddedFilePolicy;
use crate::compliance::violation::RuleId;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectRef};
use std::collections::HashSet;

/// Deepest name tree that is walked.
const MAX_NAME_TREE_DEPTH: usize = 32;

impl StructureChecker<'_> {
    /// Check a file specification dictionary and the file it embeds.
    pub fn check_file_spec(&self, spec: &Dictionary) -> Result<()> {
        let rules = self.descriptor.embedded_file_rules();
        let name = entry_text(self.store, spec, "UF")
            .or_else(|| entry_text(self.store, spec, "F"))
            .unwrap_or_else(|| "(unnamed)".to_string());

        let embedded = self
            .store
            .entry_dict(spec, "EF")
            .and_then(|ef| self.store.entry(ef, "F"))
            .filter(|f| f.is_stream());
        if embedded.is_some() {
            self.reporter.ensure(
                rules.policy != EmbeddedFilePolicy::Forbidden,
                RuleId::EmbeddedFilesNotAllowed,
            )?;
        }

        if rules.require_file_names {
            self.reporter.ensure_with(
                spec.contains_key("F") && spec.contains_key("UF"),
                RuleId::FileSpecNamesRequired,
                [name.as_str()],
            )?;
        }
        let relationship = self.store.entry(spec, "AFRelationship").and_then(Object::as_name);
        if rules.require_relationship {
            self.reporter.ensure_with(
                relationship.is_some(),
                RuleId::FileSpecRelationshipRequired,
                [name.as_str()],
            )?;
        }

        let Some(Object::Stream { dict: stream, .. }) = embedded else {
            return Ok(());
        };
        let mime_type = self.store.entry(stream, "Subtype").and_then(Object::as_name);
        if rules.require_mime_type {
            self.reporter.ensure_with(
                mime_type.is_some(),
                RuleId::EmbeddedFileMimeTypeRequired,
                [name.as_str()],
            )?;
        }
        if rules.require_mod_date {
            let has_mod_date = self
                .store
                .entry_dict(stream, "Params")
                .is_some_and(|params| self.store.entry(params, "ModDate").is_some());
            self.reporter.ensure_with(
                has_mod_date,
                RuleId::EmbeddedFileModDateRequired,
                [name.as_str()],
            )?;
        }

        // MIME names are written with '/' escaped as #2F
        let mime_type = mime_type.map(|m| m.replace("#2F", "/").replace("#2f", "/"));
        if !rules.payload_allowed(mime_type.as_deref(), relationship) {
            return self.reporter.raise_with(
                RuleId::EmbeddedFileShallBePdf,
                [name, mime_type.unwrap_or_else(|| "(none)".to_string())],
            );
        }
        Ok(())
    }

    /// Every file specification in the EmbeddedFiles name tree and the
    /// catalog AF array.
    pub(super) fn check_embedded_files(&self, catalog: &Dictionary) -> Result<()> {
        let rules = self.descriptor.embedded_file_rules();
        let tree = self
            .store
            .entry_dict(catalog, "Names")
            .and_then(|names| self.store.entry_dict(names, "EmbeddedFiles"));

        if tree.is_some() {
            self.reporter.ensure(
                rules.policy != EmbeddedFilePolicy::Forbidden,
                RuleId::EmbeddedFilesNotAllowed,
            )?;
        }

        let mut specs = Vec::new();
        let mut visited = HashSet::new();
        if let Some(tree) = tree {
            self.collect_name_tree_values(tree, &mut specs, &mut visited, 0);
        }
        if let Some(af) = self.store.entry_array(catalog, "AF") {
            for item in af {
                let fresh = match item {
                    Object::Reference(r) => visited.insert(*r),
                    _ => true,
                };
                if fresh {
                    specs.extend(self.store.resolve_dict(item));
                }
            }
        }

        for spec in &specs {
            self.check_file_spec(spec)?;
        }
        if rules.require_at_least_one {
            let embedded = specs.iter().any(|spec| spec.contains_key("EF"));
            self.reporter.ensure(embedded, RuleId::EmbeddedFileRequired)?;
        }
        Ok(())
    }

    fn collect_name_tree_values<'s>(
        &'s self,
        node: &'s Dictionary,
        out: &mut Vec<&'s Dictionary>,
        visited: &mut HashSet<ObjectRef>,
        depth: usize,
    ) {
        if depth > MAX_NAME_TREE_DEPTH {
            log::warn!("EmbeddedFiles name tree deeper than {}, rest not checked", MAX_NAME_TREE_DEPTH);
            return;
        }
        if let Some(names) = self.store.entry_array(node, "Names") {
            // Alternating key, value pairs
            for value in names.iter().skip(1).step_by(2) {
                if let Object::Reference(r) = value {
                    if !visited.insert(*r) {
                        continue;
                    }
                }
                out.extend(self.store.resolve_dict(value));
            }
        }
        if let Some(kids) = self.store.entry_array(node, "Kids") {
            for kid in kids {
                if let Object::Reference(r) = kid {
                    if !visited.insert(*r) {
                        continue;
                    }
                }
                if let Some(kid) = self.store.resolve_dict(kid) {
                    self.collect_name_tree_values(kid, out, visited, depth + 1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::compliance::types::PdfALevel;
    use crate::store::ObjectStore;

    fn rule_of(result: Result<()>) -> Option<RuleId> {
        result.err().and_then(|e| e.violation().map(|v| v.rule()))
    }

    fn dict(entries: Vec<(&str, Object)>) -> Dictionary {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// A complete part 3 style file specification.
    fn file_spec(store: &mut ObjectStore, mime: &str, relationship: &str) -> Dictionary {
        let stream_dict = dict(vec![
            ("Type", Object::name("EmbeddedFile")),
            ("Subtype", Object::name(mime)),
            ("Params", Object::dict([("ModDate", Object::string("D:20240101000000Z"))])),
        ]);
        let stream = store.insert(Object::stream(stream_dict, b"a,b\n1,2\n".to_vec()));
        dict(vec![
            ("Type", Object::name("Filespec")),
            ("F", Object::string("data.csv")),
            ("UF", Object::string("data.csv")),
            ("AFRelationship", Object::name(relationship)),
            ("EF", Object::dict([("F", Object::Reference(stream))])),
        ])
    }

    fn with_tree(store: &mut ObjectStore, catalog: ObjectRef, spec: Dictionary) {
        let spec = store.insert(Object::Dictionary(spec));
        let names = Object::dict([(
            "EmbeddedFiles",
            Object::dict([("Names", Object::Array(vec![Object::string("data.csv"), Object::Reference(spec)]))]),
        )]);
        if let Some(cat) = store.get_mut(catalog).and_then(Object::as_dict_mut) {
            cat.insert("Names".to_string(), names);
        }
    }

    fn catalog_of(store: &ObjectStore, catalog: ObjectRef) -> &Dictionary {
        store.get(catalog).and_then(Object::as_dict).unwrap()
    }

    #[test]
    fn test_forbidden_in_part1() {
        let (mut store, catalog) = minimal_store();
        let spec = file_spec(&mut store, "application/pdf", "Source");
        with_tree(&mut store, catalog, spec);
        let d = descriptor(PdfALevel::A1b);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_embedded_files(catalog_of(&store, catalog))),
            Some(RuleId::EmbeddedFilesNotAllowed)
        );
    }

    #[test]
    fn test_any_payload_in_part3() {
        let (mut store, catalog) = minimal_store();
        let spec = file_spec(&mut store, "text/csv", "Data");
        with_tree(&mut store, catalog, spec);
        let d = descriptor(PdfALevel::A3b);
        assert!(StructureChecker::new(&d, &store)
            .check_embedded_files(catalog_of(&store, catalog))
            .is_ok());
    }

    #[test]
    fn test_archival_only_in_part2() {
        let (mut store, _) = minimal_store();
        let d = descriptor(PdfALevel::A2b);
        let csv = file_spec(&mut store, "text/csv", "Data");
        let err = StructureChecker::new(&d, &store).check_file_spec(&csv).unwrap_err();
        let v = err.violation().unwrap();
        assert_eq!(v.rule(), RuleId::EmbeddedFileShallBePdf);
        assert_eq!(v.params(), ["data.csv".to_string(), "text/csv".to_string()]);

        let source = file_spec(&mut store, "text/csv", "Source");
        assert!(StructureChecker::new(&d, &store).check_file_spec(&source).is_ok());
    }

    #[test]
    fn test_part3_requirements() {
        let (mut store, _) = minimal_store();
        let d = descriptor(PdfALevel::A3u);

        let mut spec = file_spec(&mut store, "text/csv", "Data");
        spec.shift_remove("AFRelationship");
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_file_spec(&spec)),
            Some(RuleId::FileSpecRelationshipRequired)
        );

        let mut spec = file_spec(&mut store, "text/csv", "Data");
        spec.shift_remove("UF");
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_file_spec(&spec)),
            Some(RuleId::FileSpecNamesRequired)
        );
    }

    #[test]
    fn test_part4f_requires_a_file() {
        let (store, catalog) = minimal_store();
        let d = descriptor(PdfALevel::A4f);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_embedded_files(catalog_of(&store, catalog))),
            Some(RuleId::EmbeddedFileRequired)
        );
    }
}
