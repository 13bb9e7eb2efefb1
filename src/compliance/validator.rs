//! Validation of existing PDF files.
//!
//! The validator re-opens bytes with the reader, replays each page's
//! content streams through the same [`ContentChecker`] the authoring canvas
//! uses, and then runs the deferred structural pass. Like authoring, it
//! stops at the first violation.

use super::checker::{inherited_resources, DocumentView, StructureChecker};
use super::profile::ProfileDescriptor;
use super::types::PdfALevel;
use crate::color::ColorUsageChecker;
use crate::config::ValidatorOptions;
use crate::content::checker::{group_blending_profile, ContentChecker};
use crate::content::graphics_state::GraphicsStateTracker;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use crate::reader::{read_document, ParsedDocument};
use crate::store::ObjectStore;
use crate::xmp;

/// Checks a finished file against one profile.
#[derive(Debug, Clone)]
pub struct PdfAValidator {
    descriptor: ProfileDescriptor,
    options: ValidatorOptions,
}

impl PdfAValidator {
    /// Create a validator for a built-in profile.
    pub fn new(level: PdfALevel) -> Self {
        Self::with_descriptor(ProfileDescriptor::for_level(level))
    }

    /// Create a validator enforcing a custom descriptor.
    pub fn with_descriptor(descriptor: ProfileDescriptor) -> Self {
        Self {
            descriptor,
            options: ValidatorOptions::default(),
        }
    }

    /// Set validation options.
    pub fn with_options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    /// The profile being enforced.
    pub fn level(&self) -> PdfALevel {
        self.descriptor.level()
    }

    /// Validate a file. Returns the first violation as an error.
    pub fn validate_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut document = read_document(bytes)?;
        self.validate_document(&mut document)
    }

    /// Validate an already parsed file. Page transparency usage found
    /// while replaying content is recorded in `document.pages`.
    pub fn validate_document(&self, document: &mut ParsedDocument) -> Result<()> {
        if self.options.replay_content {
            self.replay_pages(document)?;
        }

        let view = DocumentView {
            catalog: document.catalog,
            trailer: &document.trailer,
            header_version: document.header_version,
            pages: &document.pages,
            output_intents: &document.output_intents,
        };
        StructureChecker::new(&self.descriptor, &document.store).check_document(&view)?;

        log::info!(
            "Validated {} pages against {}",
            document.pages.len(),
            self.descriptor.level()
        );
        Ok(())
    }

    fn replay_pages(&self, document: &mut ParsedDocument) -> Result<()> {
        let store = &document.store;
        let mut colors = ColorUsageChecker::new(&self.descriptor);
        let empty = Dictionary::new();

        for (index, page) in document.pages.iter_mut().enumerate() {
            let object = store.fetch(page.reference)?;
            let Some(dict) = object.as_dict() else {
                return Err(Error::InvalidPdf(format!("page {} is not a dictionary", index + 1)));
            };
            let content = page_content(store, dict)?;
            if content.is_empty() {
                continue;
            }

            let resources = inherited_resources(store, dict).unwrap_or(&empty);
            let blending = group_blending_profile(store, dict);
            let mut tracker = GraphicsStateTracker::new(&self.descriptor);
            ContentChecker::new(
                &self.descriptor,
                store,
                &mut colors,
                &mut tracker,
                page.effective_intents(&document.output_intents),
            )
            .with_blending_profile(blending.as_ref())
            .with_max_form_depth(self.options.max_form_depth)
            .replay(&content, resources)?;

            page.uses_transparency = tracker.uses_transparency();
            log::debug!(
                "Replayed page {} ({} bytes, transparency: {})",
                index + 1,
                content.len(),
                page.uses_transparency
            );
        }
        Ok(())
    }
}

/// Decoded page content; an array of streams is joined with newlines.
pub(crate) fn page_content(store: &ObjectStore, page: &Dictionary) -> Result<Vec<u8>> {
    let Some(contents) = page.get("Contents") else {
        return Ok(Vec::new());
    };
    let streams: Vec<&Object> = match store.resolve(contents) {
        Object::Array(items) => items.iter().map(|item| store.resolve(item)).collect(),
        single => vec![single],
    };

    let mut data = Vec::new();
    for stream in streams.into_iter().filter(|s| s.is_stream()) {
        data.extend_from_slice(&stream.decode_stream_data()?);
        data.push(b'\n');
    }
    Ok(data)
}

/// The PDF/A level a file claims in its XMP identification, if any.
pub fn detect_level(bytes: &[u8]) -> Result<Option<PdfALevel>> {
    let document = read_document(bytes)?;
    let store = &document.store;
    let metadata = store
        .get(document.catalog)
        .and_then(Object::as_dict)
        .and_then(|catalog| store.entry(catalog, "Metadata"))
        .filter(|m| m.is_stream());
    let Some(metadata) = metadata else {
        return Ok(None);
    };
    let identification = xmp::parse_identification(&metadata.decode_stream_data()?)?;
    Ok(identification.level())
}
