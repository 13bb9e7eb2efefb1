//! Action and additional-action checks.

use super::StructureChecker;
use crate::compliance::rules::{ActionContext, AdditionalActionsPolicy};
use crate::compliance::violation::RuleId;
use crate::error::Result;
use crate::object::{Dictionary, Object};
use std::collections::HashSet;

/// Longest /Next chain (or outline sibling chain) that is followed.
pub const MAX_ACTION_CHAIN: usize = 1024;

impl StructureChecker<'_> {
    /// Check an action and every action reachable through /Next.
    pub fn check_action(&self, context: ActionContext, action: &Dictionary) -> Result<()> {
        let rules = self.descriptor.action_rules();
        let mut pending = vec![action];
        let mut seen = 0;

        while let Some(current) = pending.pop() {
            seen += 1;
            if seen > MAX_ACTION_CHAIN {
                log::warn!("Action chain longer than {} entries, rest not checked", MAX_ACTION_CHAIN);
                break;
            }

            if let Some(action_type) = self.store.entry(current, "S").and_then(Object::as_name) {
                if !rules.permits_action(context, action_type) {
                    return self.reporter.raise_with(RuleId::ActionNotAllowed, [action_type]);
                }
                if action_type == "Named" {
                    let name = self
                        .store
                        .entry(current, "N")
                        .and_then(Object::as_name)
                        .unwrap_or_default();
                    if !rules.permits_named_action(name) {
                        return self.reporter.raise_with(RuleId::NamedActionNotAllowed, [name]);
                    }
                }
            }

            match self.store.entry(current, "Next") {
                Some(Object::Array(items)) => {
                    pending.extend(items.iter().rev().filter_map(|o| self.store.resolve_dict(o)));
                },
                Some(next) => pending.extend(next.as_dict()),
                None => {},
            }
        }
        Ok(())
    }

    /// Check an AA dictionary found in `context`: the trigger keys per the
    /// policy, then every action it holds.
    pub fn check_additional_actions(&self, context: ActionContext, aa: &Dictionary) -> Result<()> {
        match self.descriptor.action_rules().additional_actions_policy(context) {
            AdditionalActionsPolicy::Forbidden(rule) => return self.reporter.raise(rule),
            AdditionalActionsPolicy::AllowedKeys(keys) => {
                if let Some(key) = aa.keys().find(|k| !keys.contains(&k.as_str())) {
                    return self
                        .reporter
                        .raise_with(RuleId::AdditionalActionsKeyNotAllowed, [key.as_str()]);
                }
            },
            AdditionalActionsPolicy::Unrestricted => {},
        }
        for value in aa.values() {
            if let Some(action) = self.store.resolve_dict(value) {
                self.check_action(context, action)?;
            }
        }
        Ok(())
    }

    /// Catalog-level actions: OpenAction, AA, the JavaScript name tree and
    /// outline item actions.
    pub(super) fn check_document_actions(&self, catalog: &Dictionary) -> Result<()> {
        // An array OpenAction is a destination, not an action
        if let Some(open_action) = self.store.entry_dict(catalog, "OpenAction") {
            self.check_action(ActionContext::OpenAction, open_action)?;
        }
        if let Some(aa) = self.store.entry_dict(catalog, "AA") {
            self.check_additional_actions(ActionContext::CatalogAdditionalActions, aa)?;
        }
        if let Some(names) = self.store.entry_dict(catalog, "Names") {
            self.reporter
                .ensure(!names.contains_key("JavaScript"), RuleId::JavaScriptNotAllowed)?;
        }
        if let Some(outlines) = self.store.entry_dict(catalog, "Outlines") {
            self.check_outline_actions(outlines)?;
        }
        Ok(())
    }

    fn check_outline_actions(&self, root: &Dictionary) -> Result<()> {
        let mut pending: Vec<&Object> = root.get("First").into_iter().collect();
        let mut visited = HashSet::new();

        while let Some(item_ref) = pending.pop() {
            if let Object::Reference(r) = item_ref {
                if !visited.insert(*r) {
                    continue;
                }
            }
            if visited.len() > MAX_ACTION_CHAIN * 64 {
                break;
            }
            let Some(item) = self.store.resolve_dict(item_ref) else {
                continue;
            };
            if let Some(action) = self.store.entry_dict(item, "A") {
                self.check_action(ActionContext::Outline, action)?;
            }
            pending.extend(item.get("Next"));
            pending.extend(item.get("First"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::compliance::types::PdfALevel;
    use crate::compliance::violation::ConformanceViolation;

    fn action(kind: &str) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("S".to_string(), Object::name(kind));
        dict
    }

    fn rule_of(result: Result<()>) -> Option<RuleId> {
        result.err().and_then(|e| e.violation().map(ConformanceViolation::rule))
    }

    mod action_types {
        use super::*;

        #[test]
        fn test_launch_denied_in_part1() {
            let (store, _) = minimal_store();
            let d = descriptor(PdfALevel::A1b);
            let checker = StructureChecker::new(&d, &store);
            let result = checker.check_action(ActionContext::OpenAction, &action("Launch"));
            assert_eq!(rule_of(result), Some(RuleId::ActionNotAllowed));
        }

        #[test]
        fn test_part4_allow_list() {
            let (store, _) = minimal_store();
            let d = descriptor(PdfALevel::A4);
            let checker = StructureChecker::new(&d, &store);
            assert!(checker.check_action(ActionContext::Annotation, &action("URI")).is_ok());
            assert_eq!(
                rule_of(checker.check_action(ActionContext::Annotation, &action("Thread"))),
                Some(RuleId::ActionNotAllowed)
            );
        }

        #[test]
        fn test_named_action_names() {
            let (store, _) = minimal_store();
            let d = descriptor(PdfALevel::A2b);
            let checker = StructureChecker::new(&d, &store);
            let mut named = action("Named");
            named.insert("N".to_string(), Object::name("NextPage"));
            assert!(checker.check_action(ActionContext::Annotation, &named).is_ok());
            named.insert("N".to_string(), Object::name("Print"));
            assert_eq!(
                rule_of(checker.check_action(ActionContext::Annotation, &named)),
                Some(RuleId::NamedActionNotAllowed)
            );
        }

        #[test]
        fn test_next_chain_is_followed() {
            let (mut store, _) = minimal_store();
            let js = store.insert(Object::Dictionary(action("JavaScript")));
            let mut first = action("GoTo");
            first.insert(
                "Next".to_string(),
                Object::Array(vec![Object::Dictionary(action("URI")), Object::Reference(js)]),
            );
            let d = descriptor(PdfALevel::A3b);
            let checker = StructureChecker::new(&d, &store);
            let err = checker.check_action(ActionContext::Outline, &first).unwrap_err();
            assert_eq!(err.violation().unwrap().params(), ["JavaScript".to_string()]);
        }
    }

    mod additional_actions {
        use super::*;

        #[test]
        fn test_catalog_aa_forbidden_in_parts_1_to_3() {
            let (store, _) = minimal_store();
            let aa = Dictionary::new();
            for level in [PdfALevel::A1b, PdfALevel::A2b, PdfALevel::A3u] {
                let d = descriptor(level);
                let checker = StructureChecker::new(&d, &store);
                assert_eq!(
                    rule_of(checker.check_additional_actions(ActionContext::CatalogAdditionalActions, &aa)),
                    Some(RuleId::CatalogAdditionalActionsNotAllowed)
                );
            }
        }

        #[test]
        fn test_page_aa_allowed_only_in_part1() {
            let (store, _) = minimal_store();
            let aa = Dictionary::new();
            let d1 = descriptor(PdfALevel::A1b);
            assert!(StructureChecker::new(&d1, &store)
                .check_additional_actions(ActionContext::PageAdditionalActions, &aa)
                .is_ok());
            let d2 = descriptor(PdfALevel::A2u);
            assert_eq!(
                rule_of(
                    StructureChecker::new(&d2, &store)
                        .check_additional_actions(ActionContext::PageAdditionalActions, &aa)
                ),
                Some(RuleId::PageAdditionalActionsNotAllowed)
            );
        }

        #[test]
        fn test_part4_trigger_keys() {
            let (store, _) = minimal_store();
            let d = descriptor(PdfALevel::A4);
            let checker = StructureChecker::new(&d, &store);
            let mut aa = Dictionary::new();
            aa.insert("PO".to_string(), Object::Dictionary(action("GoTo")));
            assert!(checker
                .check_additional_actions(ActionContext::PageAdditionalActions, &aa)
                .is_ok());
            aa.insert("WC".to_string(), Object::Dictionary(action("GoTo")));
            let err = checker
                .check_additional_actions(ActionContext::CatalogAdditionalActions, &aa)
                .unwrap_err();
            let violation = err.violation().unwrap();
            assert_eq!(violation.rule(), RuleId::AdditionalActionsKeyNotAllowed);
            assert_eq!(violation.params(), ["WC".to_string()]);
        }
    }

    #[test]
    fn test_outline_actions_are_checked() {
        let (mut store, catalog) = minimal_store();
        let item = store.insert(Object::dict([
            ("Title", Object::string("Intro")),
            ("A", Object::Dictionary(action("Sound"))),
        ]));
        let outlines = store.insert(Object::dict([("First", Object::Reference(item))]));
        if let Some(dict) = store.get_mut(catalog).and_then(Object::as_dict_mut) {
            dict.insert("Outlines".to_string(), Object::Reference(outlines));
        }
        let d = descriptor(PdfALevel::A2b);
        let checker = StructureChecker::new(&d, &store);
        let catalog_dict = store.get(catalog).and_then(Object::as_dict).unwrap();
        assert_eq!(rule_of(checker.check_document_actions(catalog_dict)), Some(RuleId::ActionNotAllowed));
    }
}
