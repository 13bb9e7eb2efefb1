//! Structural conformance checks.
//!
//! [`StructureChecker`] holds the per-object checks used by the authoring
//! calls (annotations, actions, fonts, XObjects, file specifications) and
//! the deferred document pass run at close or by the validator. Each
//! aspect lives in its own submodule as an `impl StructureChecker` block.

mod actions;
mod annotations;
mod catalog;
mod embedded_files;
mod fonts;
mod pages;
mod xobjects;

use super::profile::ProfileDescriptor;
use super::types::PdfVersion;
use super::violation::ViolationReporter;
use crate::color::OutputIntent;
use crate::error::{Error, Result};
use crate::object::{dict_name, Dictionary, Object, ObjectRef};
use crate::store::ObjectStore;

pub use actions::MAX_ACTION_CHAIN;
pub(crate) use pages::inherited_resources;

/// A page as seen by the deferred pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Page dictionary
    pub reference: ObjectRef,
    /// Page-level output intents; empty when the page has none
    pub output_intents: Vec<OutputIntent>,
    /// Whether the page content used transparency
    pub uses_transparency: bool,
}

impl PageRecord {
    /// Create a record for a page without page-level intents.
    pub fn new(reference: ObjectRef) -> Self {
        Self {
            reference,
            output_intents: Vec::new(),
            uses_transparency: false,
        }
    }

    /// Intents in scope on this page: its own if it has any, otherwise
    /// the document-level ones. The two sets are never merged.
    pub fn effective_intents<'a>(&'a self, document_intents: &'a [OutputIntent]) -> &'a [OutputIntent] {
        if self.output_intents.is_empty() {
            document_intents
        } else {
            &self.output_intents
        }
    }
}

/// Everything the deferred pass looks at besides the object store.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    /// Catalog reference
    pub catalog: ObjectRef,
    /// Trailer dictionary
    pub trailer: &'a Dictionary,
    /// Version in the file header
    pub header_version: PdfVersion,
    /// Pages in order
    pub pages: &'a [PageRecord],
    /// Document-level output intents
    pub output_intents: &'a [OutputIntent],
}

/// Runs per-object checks and the deferred document pass.
#[derive(Debug, Clone, Copy)]
pub struct StructureChecker<'a> {
    descriptor: &'a ProfileDescriptor,
    reporter: ViolationReporter,
    store: &'a ObjectStore,
}

impl<'a> StructureChecker<'a> {
    /// Create a checker over `store`.
    pub fn new(descriptor: &'a ProfileDescriptor, store: &'a ObjectStore) -> Self {
        Self {
            descriptor,
            reporter: ViolationReporter::new(descriptor.level()),
            store,
        }
    }

    /// The descriptor being enforced.
    pub fn descriptor(&self) -> &'a ProfileDescriptor {
        self.descriptor
    }

    /// The deferred pass. Stops at the first violation.
    pub fn check_document(&self, view: &DocumentView<'_>) -> Result<()> {
        let catalog = self.catalog_dict(view.catalog)?;

        self.check_versions(catalog, view.header_version)?;
        self.check_trailer(view.trailer)?;
        self.check_object_count()?;
        self.check_document_info(catalog, view.trailer)?;
        self.check_metadata(catalog)?;
        self.check_output_intents(view.output_intents)?;
        self.check_catalog_entries(catalog)?;
        self.check_acroform(catalog)?;
        self.check_optional_content(catalog)?;
        self.check_document_actions(catalog)?;
        self.check_tagging(catalog)?;
        for (index, page) in view.pages.iter().enumerate() {
            self.check_page(index, page, view.output_intents)?;
        }
        self.check_embedded_files(catalog)?;

        log::debug!(
            "Deferred pass passed for {} ({} pages, {} objects)",
            self.descriptor.level(),
            view.pages.len(),
            self.store.len()
        );
        Ok(())
    }

    /// Check one object on its own, by type. Used when an object is
    /// flushed before the deferred pass.
    pub fn check_object(&self, object: &Object) -> Result<()> {
        let Some(dict) = object.as_dict() else {
            return Ok(());
        };
        match (dict_name(dict, "Type"), dict_name(dict, "Subtype")) {
            (_, Some("Widget")) | (Some("Annot"), _) => self.check_annotation(dict),
            (Some("Action"), _) => self.check_action(super::rules::ActionContext::Annotation, dict),
            (Some("Font"), _) => self.check_font("(flushed)", dict),
            (_, Some("Image")) => self.check_image("(flushed)", dict),
            (_, Some("Form")) | (_, Some("PS")) => self.check_form("(flushed)", dict),
            (Some("ExtGState"), _) => self.check_ext_gstate("(flushed)", dict).map(|_| ()),
            (Some("Filespec"), _) => self.check_file_spec(dict),
            _ if dict.contains_key("S") && dict.contains_key("Next") => {
                self.check_action(super::rules::ActionContext::Annotation, dict)
            },
            _ => Ok(()),
        }
    }

    fn catalog_dict(&self, catalog: ObjectRef) -> Result<&'a Dictionary> {
        let object = self.store.fetch(catalog)?;
        object.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: object.type_name().to_string(),
        })
    }
}

/// Text of a string or name entry, for diagnostics.
fn entry_text(store: &ObjectStore, dict: &Dictionary, key: &str) -> Option<String> {
    match store.entry(dict, key)? {
        Object::String(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(name) => Some(name.clone()),
        _ => None,
    }
}
