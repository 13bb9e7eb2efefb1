//! PDF/A document authoring.
//!
//! [`PdfDocument`] owns the object graph of a document being produced and
//! enforces its profile at two points. Each authoring call checks what it
//! adds before it is stored (the immediate tier); [`PdfDocument::close`]
//! completes the catalog and runs the deferred structural pass before the
//! file is written. The first violation leaves the document failed and
//! every later call returns [`Error::DocumentFailed`].
//!
//! # Example
//!
//! ```no_run
//! use pdfa_conformance::color::icc::synthetic_profile;
//! use pdfa_conformance::{IccProfile, OutputIntent, PdfALevel, PdfDocument};
//!
//! let mut doc = PdfDocument::new(PdfALevel::A2b)?;
//! let profile = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3);
//! doc.add_output_intent(OutputIntent::pdfa("sRGB", profile))?;
//! let page = doc.add_page(612.0, 792.0)?;
//!
//! let mut canvas = doc.canvas(page)?;
//! canvas.save_state()?;
//! canvas.set_fill_rgb(0.2, 0.4, 0.6)?;
//! canvas.rectangle(72.0, 72.0, 200.0, 100.0)?;
//! canvas.fill()?;
//! canvas.restore_state()?;
//! canvas.finish()?;
//!
//! let bytes = doc.close()?;
//! # Ok::<(), pdfa_conformance::Error>(())
//! ```

use crate::color::{ColorSpace, ColorUsageChecker, IccProfile, OutputIntent};
use crate::compliance::checker::{inherited_resources, DocumentView, PageRecord, StructureChecker};
use crate::compliance::profile::ProfileDescriptor;
use crate::compliance::rules::ActionContext;
use crate::compliance::types::{PdfALevel, PdfAPart, PdfVersion};
use crate::compliance::validator::page_content;
use crate::compliance::violation::{RuleId, ViolationReporter};
use crate::config::DocumentConfig;
use crate::content::canvas::Canvas;
use crate::content::checker::{group_blending_profile, ContentChecker};
use crate::content::graphics_state::GraphicsStateTracker;
use crate::content::operators::{write_content, ContentOp};
use crate::error::{Error, Result};
use crate::flush::ObjectFlushGuard;
use crate::object::{dict_name, Dictionary, Object, ObjectRef};
use crate::store::ObjectStore;
use crate::writer::{compress_data, PdfWriter};
use crate::xmp::{iso_timestamp, XmpPacket};

/// Resource categories of a page resource dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// /Font
    Font,
    /// /ExtGState
    ExtGState,
    /// /XObject (images, forms)
    XObject,
    /// /ColorSpace
    ColorSpace,
    /// /Shading
    Shading,
    /// /Pattern
    Pattern,
}

impl ResourceKind {
    /// Key of the category in a resource dictionary.
    pub fn category(&self) -> &'static str {
        match self {
            ResourceKind::Font => "Font",
            ResourceKind::ExtGState => "ExtGState",
            ResourceKind::XObject => "XObject",
            ResourceKind::ColorSpace => "ColorSpace",
            ResourceKind::Shading => "Shading",
            ResourceKind::Pattern => "Pattern",
        }
    }
}

/// A file to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFile {
    /// File name, written to /F and /UF
    pub name: String,
    /// File contents
    pub data: Vec<u8>,
    /// MIME type, written as the stream /Subtype
    pub mime_type: Option<String>,
    /// /AFRelationship (Source, Data, Alternative, Supplement, Unspecified)
    pub relationship: Option<String>,
    /// /Desc
    pub description: Option<String>,
    /// Modification date in PDF date format, written to /Params
    pub mod_date: Option<String>,
}

impl EmbeddedFile {
    /// A file with no optional entries.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            mime_type: None,
            relationship: None,
            description: None,
            mod_date: None,
        }
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the relationship to the document.
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the modification date.
    pub fn with_mod_date(mut self, date: impl Into<String>) -> Self {
        self.mod_date = Some(date.into());
        self
    }

    /// Use the current time as modification date.
    pub fn with_mod_date_now(self) -> Self {
        self.with_mod_date(pdf_timestamp())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    Open,
    Failed,
    Closed,
}

/// A PDF/A document being produced.
#[derive(Debug)]
pub struct PdfDocument {
    descriptor: ProfileDescriptor,
    reporter: ViolationReporter,
    config: DocumentConfig,
    header_version: PdfVersion,
    store: ObjectStore,
    catalog: ObjectRef,
    pages_root: ObjectRef,
    pages: Vec<PageRecord>,
    output_intents: Vec<OutputIntent>,
    /// (name, file specification), in embedding order
    embedded_files: Vec<(String, ObjectRef)>,
    colors: ColorUsageChecker,
    guard: ObjectFlushGuard,
    writer: Option<PdfWriter>,
    state: DocumentState,
}

impl PdfDocument {
    /// Create a document for a built-in profile with default configuration.
    pub fn new(level: PdfALevel) -> Result<Self> {
        Self::with_config(DocumentConfig::new(level))
    }

    /// Create a document from a configuration.
    pub fn with_config(config: DocumentConfig) -> Result<Self> {
        let descriptor = ProfileDescriptor::for_level(config.level);
        Self::with_descriptor(descriptor, config)
    }

    /// Create a document enforcing a custom descriptor. The level in
    /// `config` is ignored in favor of the descriptor's.
    pub fn with_descriptor(descriptor: ProfileDescriptor, mut config: DocumentConfig) -> Result<Self> {
        config.level = descriptor.level();
        let reporter = ViolationReporter::new(descriptor.level());
        let header_version = config
            .parsed_header_version()?
            .unwrap_or(descriptor.default_header_version);
        if !descriptor.header_version_allowed(header_version) {
            let expected = format!("{} to {}", descriptor.min_header_version, descriptor.max_header_version);
            return reporter.raise_with(RuleId::HeaderVersionNotAllowed, [header_version.to_string(), expected]);
        }

        let mut store = ObjectStore::new();
        let pages_root = store.insert(Object::dict([
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(Vec::new())),
            ("Count", Object::Integer(0)),
        ]));
        let catalog = store.insert(Object::dict([
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(pages_root)),
        ]));

        let mut guard = ObjectFlushGuard::new();
        for reference in [pages_root, catalog] {
            guard.mark_checked(reference);
            guard.pin(reference);
        }

        log::info!("Created {} document (header version {})", descriptor.level(), header_version);
        Ok(Self {
            colors: ColorUsageChecker::new(&descriptor),
            descriptor,
            reporter,
            config,
            header_version,
            store,
            catalog,
            pages_root,
            pages: Vec::new(),
            output_intents: Vec::new(),
            embedded_files: Vec::new(),
            guard,
            writer: Some(PdfWriter::new(header_version)?),
            state: DocumentState::Open,
        })
    }

    /// Target profile.
    pub fn level(&self) -> PdfALevel {
        self.descriptor.level()
    }

    /// The descriptor being enforced.
    pub fn descriptor(&self) -> &ProfileDescriptor {
        &self.descriptor
    }

    /// The configuration in use.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Version written in the file header.
    pub fn header_version(&self) -> PdfVersion {
        self.header_version
    }

    /// The object graph.
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Catalog reference.
    pub fn catalog(&self) -> ObjectRef {
        self.catalog
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Reference of a page dictionary.
    pub fn page_reference(&self, page: usize) -> Result<ObjectRef> {
        self.pages.get(page).map(|p| p.reference).ok_or(Error::UnknownPage(page))
    }

    /// Document-level output intents registered so far.
    pub fn output_intents(&self) -> &[OutputIntent] {
        &self.output_intents
    }

    /// Returns true once a violation has been raised.
    pub fn is_failed(&self) -> bool {
        self.state == DocumentState::Failed
    }

    /// Returns true once the document has been closed.
    pub fn is_closed(&self) -> bool {
        self.state == DocumentState::Closed
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            DocumentState::Open => Ok(()),
            DocumentState::Failed => Err(Error::DocumentFailed),
            DocumentState::Closed => Err(Error::DocumentClosed),
        }
    }

    /// Record a conformance failure as the document's final state.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_conformance() {
                self.state = DocumentState::Failed;
            }
        }
        result
    }

    fn structure(&self) -> StructureChecker<'_> {
        StructureChecker::new(&self.descriptor, &self.store)
    }

    fn page_dict_mut(&mut self, page: usize) -> Result<&mut Dictionary> {
        let reference = self.page_reference(page)?;
        self.store
            .get_mut(reference)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(reference.id, reference.gen))
    }

    fn catalog_dict_mut(&mut self) -> Result<&mut Dictionary> {
        let catalog = self.catalog;
        self.store
            .get_mut(catalog)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(catalog.id, catalog.gen))
    }

    /// Insert an object that passed its checks.
    fn insert_checked(&mut self, object: Object) -> ObjectRef {
        let reference = self.store.insert(object);
        self.guard.mark_checked(reference);
        reference
    }

    /// Append a page of the given size in points. Returns its index.
    pub fn add_page(&mut self, width: f64, height: f64) -> Result<usize> {
        self.ensure_open()?;
        let page = Object::dict([
            ("Type", Object::name("Page")),
            ("Parent", Object::Reference(self.pages_root)),
            ("MediaBox", Object::numbers(&[0.0, 0.0, width, height])),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]);
        let reference = self.insert_checked(page);
        self.guard.pin(reference);

        let root = self.pages_root;
        let tree = self
            .store
            .get_mut(root)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(root.id, root.gen))?;
        if let Some(Object::Array(kids)) = tree.get_mut("Kids") {
            kids.push(Object::Reference(reference));
        }
        tree.insert("Count".to_string(), Object::Integer(self.pages.len() as i64 + 1));

        self.pages.push(PageRecord::new(reference));
        Ok(self.pages.len() - 1)
    }

    /// Add an indirect object without checking it. It is checked when it
    /// is flushed with [`PdfDocument::flush_with_dependents`], or at close
    /// before anything is written.
    pub fn add_object(&mut self, object: Object) -> Result<ObjectRef> {
        self.ensure_open()?;
        Ok(self.store.insert(object))
    }

    /// Mutable access to an object that has not been flushed. The object
    /// counts as unchecked afterwards; close checks it again and replays
    /// the pages that draw with it.
    pub fn object_mut(&mut self, reference: ObjectRef) -> Result<&mut Object> {
        self.ensure_open()?;
        self.guard.ensure_mutable(reference)?;
        self.guard.invalidate(reference);
        self.store
            .get_mut(reference)
            .ok_or(Error::ObjectNotFound(reference.id, reference.gen))
    }

    /// Check a resource and bind it under `name` in the page's resources.
    pub fn add_resource(&mut self, page: usize, kind: ResourceKind, name: &str, object: Object) -> Result<ObjectRef> {
        self.ensure_open()?;
        self.page_reference(page)?;
        let result = self.check_resource(kind, name, &object);
        self.track(result)?;

        let reference = self.insert_checked(object);
        let resources = self.page_dict_mut(page)?;
        let resources = match resources
            .entry("Resources".to_string())
            .or_insert_with(|| Object::Dictionary(Dictionary::new()))
            .as_dict_mut()
        {
            Some(resources) => resources,
            None => return Err(Error::InvalidPdf(format!("page {} /Resources is not a dictionary", page))),
        };
        let category = resources
            .entry(kind.category().to_string())
            .or_insert_with(|| Object::Dictionary(Dictionary::new()));
        if let Some(category) = category.as_dict_mut() {
            category.insert(name.to_string(), Object::Reference(reference));
        }
        Ok(reference)
    }

    /// Add a font resource.
    pub fn add_font(&mut self, page: usize, name: &str, font: Dictionary) -> Result<ObjectRef> {
        self.add_resource(page, ResourceKind::Font, name, Object::Dictionary(font))
    }

    /// Add an ExtGState resource.
    pub fn add_ext_gstate(&mut self, page: usize, name: &str, ext_gstate: Dictionary) -> Result<ObjectRef> {
        self.add_resource(page, ResourceKind::ExtGState, name, Object::Dictionary(ext_gstate))
    }

    /// Add an image or form XObject resource.
    pub fn add_xobject(&mut self, page: usize, name: &str, xobject: Object) -> Result<ObjectRef> {
        self.add_resource(page, ResourceKind::XObject, name, xobject)
    }

    /// Add a color space resource.
    pub fn add_color_space(&mut self, page: usize, name: &str, space: &ColorSpace) -> Result<ObjectRef> {
        let object = space.to_object(&mut self.store);
        self.add_resource(page, ResourceKind::ColorSpace, name, object)
    }

    fn check_resource(&self, kind: ResourceKind, name: &str, object: &Object) -> Result<()> {
        let checker = self.structure();
        let dict = object.as_dict();
        match (kind, dict) {
            (ResourceKind::Font, Some(font)) => checker.check_font(name, font),
            (ResourceKind::ExtGState, Some(gs)) => checker.check_ext_gstate(name, gs).map(|_| ()),
            (ResourceKind::XObject, Some(xobject)) => match dict_name(xobject, "Subtype") {
                Some("Image") => checker.check_image(name, xobject),
                _ => checker.check_form(name, xobject),
            },
            (ResourceKind::ColorSpace, _) => {
                let space = ColorSpace::from_object(object, &self.store, |_| None)?;
                let mut profiles = Vec::new();
                collect_icc_profiles(&space, &mut profiles);
                profiles
                    .into_iter()
                    .try_for_each(|profile| self.colors.check_icc_profile(profile))
            },
            (ResourceKind::Shading | ResourceKind::Pattern, _) => Ok(()),
            (_, None) => Err(Error::InvalidObjectType {
                expected: format!("{} dictionary", kind.category()),
                found: object.type_name().to_string(),
            }),
        }
    }

    /// Check an annotation and attach it to a page.
    pub fn add_annotation(&mut self, page: usize, mut annotation: Dictionary) -> Result<ObjectRef> {
        self.ensure_open()?;
        let page_ref = self.page_reference(page)?;
        let result = self.structure().check_annotation(&annotation);
        self.track(result)?;

        annotation
            .entry("Type".to_string())
            .or_insert_with(|| Object::name("Annot"));
        annotation.insert("P".to_string(), Object::Reference(page_ref));
        let reference = self.insert_checked(Object::Dictionary(annotation));

        let dict = self.page_dict_mut(page)?;
        match dict.get_mut("Annots") {
            Some(Object::Array(annots)) => annots.push(Object::Reference(reference)),
            _ => {
                dict.insert("Annots".to_string(), Object::Array(vec![Object::Reference(reference)]));
            },
        }
        Ok(reference)
    }

    /// Set the catalog /OpenAction.
    pub fn set_open_action(&mut self, action: Dictionary) -> Result<()> {
        self.set_catalog_entry("OpenAction", Object::Dictionary(action))
    }

    /// Set the catalog /AA dictionary.
    pub fn set_catalog_additional_actions(&mut self, aa: Dictionary) -> Result<()> {
        self.set_catalog_entry("AA", Object::Dictionary(aa))
    }

    /// Set a page /AA dictionary.
    pub fn set_page_additional_actions(&mut self, page: usize, aa: Dictionary) -> Result<()> {
        self.ensure_open()?;
        self.page_reference(page)?;
        let result = self
            .structure()
            .check_additional_actions(ActionContext::PageAdditionalActions, &aa);
        self.track(result)?;
        self.page_dict_mut(page)?.insert("AA".to_string(), Object::Dictionary(aa));
        Ok(())
    }

    /// Set a catalog entry.
    ///
    /// /OpenAction and /AA are checked immediately; everything else is
    /// checked by the deferred pass at close.
    pub fn set_catalog_entry(&mut self, key: &str, value: Object) -> Result<()> {
        self.ensure_open()?;
        let checker = self.structure();
        let result = match (key, self.store.resolve_dict(&value)) {
            ("OpenAction", Some(action)) => checker.check_action(ActionContext::OpenAction, action),
            ("AA", Some(aa)) => checker.check_additional_actions(ActionContext::CatalogAdditionalActions, aa),
            _ => Ok(()),
        };
        self.track(result)?;
        self.catalog_dict_mut()?.insert(key.to_string(), value);
        Ok(())
    }

    /// Register a document-level output intent.
    pub fn add_output_intent(&mut self, intent: OutputIntent) -> Result<()> {
        self.ensure_open()?;
        let mut intents = self.output_intents.clone();
        intents.push(intent);
        let result = self.structure().check_output_intents(&intents);
        self.track(result)?;
        self.output_intents = intents;
        Ok(())
    }

    /// Register a page-level output intent. A page with its own intents
    /// ignores the document-level ones.
    pub fn add_page_output_intent(&mut self, page: usize, intent: OutputIntent) -> Result<()> {
        self.ensure_open()?;
        let record = self.pages.get(page).ok_or(Error::UnknownPage(page))?;
        let mut intents = record.output_intents.clone();
        intents.push(intent);
        let result = self.structure().check_output_intents(&intents);
        self.track(result)?;
        self.pages[page].output_intents = intents;
        Ok(())
    }

    /// Embed a file and register it in the EmbeddedFiles name tree.
    pub fn embed_file(&mut self, file: EmbeddedFile) -> Result<ObjectRef> {
        self.ensure_open()?;

        let mut params = Dictionary::new();
        params.insert("Size".to_string(), Object::Integer(file.data.len() as i64));
        if let Some(date) = &file.mod_date {
            params.insert("ModDate".to_string(), Object::string(date));
        }
        let mut stream_dict = Dictionary::new();
        stream_dict.insert("Type".to_string(), Object::name("EmbeddedFile"));
        if let Some(mime) = &file.mime_type {
            stream_dict.insert("Subtype".to_string(), Object::name(mime.as_str()));
        }
        stream_dict.insert("Params".to_string(), Object::Dictionary(params));
        let stream = self.store.insert(Object::stream(stream_dict, file.data));

        let mut spec = Dictionary::new();
        spec.insert("Type".to_string(), Object::name("Filespec"));
        spec.insert("F".to_string(), Object::string(&file.name));
        spec.insert("UF".to_string(), Object::string(&file.name));
        spec.insert("EF".to_string(), Object::dict([("F", Object::Reference(stream))]));
        if let Some(description) = &file.description {
            spec.insert("Desc".to_string(), Object::string(description));
        }
        if let Some(relationship) = &file.relationship {
            spec.insert("AFRelationship".to_string(), Object::name(relationship.as_str()));
        }

        let result = self.structure().check_file_spec(&spec);
        self.track(result)?;
        self.guard.mark_checked(stream);
        let reference = self.insert_checked(Object::Dictionary(spec));
        self.embedded_files.push((file.name, reference));
        Ok(reference)
    }

    /// Start drawing on a page.
    pub fn canvas(&mut self, page: usize) -> Result<Canvas<'_>> {
        self.ensure_open()?;
        self.page_reference(page)?;
        Ok(Canvas::new(self, page))
    }

    /// Check one content operator drawn on `page` with the canvas state in
    /// `tracker`.
    pub(crate) fn check_content_op(
        &mut self,
        page: usize,
        tracker: &mut GraphicsStateTracker,
        op: &ContentOp,
    ) -> Result<()> {
        self.ensure_open()?;
        let result = self.run_content_check(page, tracker, op);
        self.track(result)
    }

    fn run_content_check(&mut self, page: usize, tracker: &mut GraphicsStateTracker, op: &ContentOp) -> Result<()> {
        let record = self.pages.get(page).ok_or(Error::UnknownPage(page))?;
        let object = self.store.fetch(record.reference)?;
        let page_dict = object.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: object.type_name().to_string(),
        })?;
        let empty = Dictionary::new();
        let resources = inherited_resources(&self.store, page_dict).unwrap_or(&empty);
        let blending = group_blending_profile(&self.store, page_dict);

        ContentChecker::new(
            &self.descriptor,
            &self.store,
            &mut self.colors,
            tracker,
            record.effective_intents(&self.output_intents),
        )
        .with_blending_profile(blending.as_ref())
        .check_op(op, resources)
    }

    /// Store the content drawn by a canvas and append it to the page.
    pub(crate) fn finish_page_content(
        &mut self,
        page: usize,
        ops: &[ContentOp],
        uses_transparency: bool,
    ) -> Result<ObjectRef> {
        self.ensure_open()?;
        self.page_reference(page)?;
        let data = write_content(ops);
        let mut dict = Dictionary::new();
        let data = if self.config.compress {
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
            compress_data(&data)?
        } else {
            data
        };
        let stream = self.insert_checked(Object::stream(dict, data));

        let page_dict = self.page_dict_mut(page)?;
        match page_dict.get_mut("Contents") {
            Some(Object::Array(contents)) => contents.push(Object::Reference(stream)),
            Some(existing) => {
                let previous = std::mem::replace(existing, Object::Null);
                *existing = Object::Array(vec![previous, Object::Reference(stream)]);
            },
            None => {
                page_dict.insert("Contents".to_string(), Object::Reference(stream));
            },
        }
        self.pages[page].uses_transparency |= uses_transparency;
        log::debug!("Page {} content: {} operators in {}", page + 1, ops.len(), stream);
        Ok(stream)
    }

    /// Write a checked object now. Returns false, doing nothing, if the
    /// object is unchecked, pinned or already written.
    pub fn flush(&mut self, reference: ObjectRef) -> Result<bool> {
        self.ensure_open()?;
        if !self.guard.try_flush(reference) {
            return Ok(false);
        }
        let object = self.store.fetch(reference)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.write_object(reference, object);
        }
        log::debug!("Flushed {}", reference);
        Ok(true)
    }

    /// Check an object and everything it references, then write them all.
    pub fn flush_with_dependents(&mut self, reference: ObjectRef) -> Result<Vec<ObjectRef>> {
        self.ensure_open()?;
        let checker = StructureChecker::new(&self.descriptor, &self.store);
        let result = self
            .guard
            .flush_with_dependents(reference, &self.store, |object| checker.check_object(object));
        let flushed = self.track(result)?;

        if let Some(writer) = self.writer.as_mut() {
            for r in &flushed {
                if let Some(object) = self.store.get(*r) {
                    writer.write_object(*r, object);
                }
            }
        }
        Ok(flushed)
    }

    /// Complete the document, run the deferred pass and return the file.
    ///
    /// Adds the output intents, XMP metadata, Info dictionary, embedded
    /// file tree and trailer /ID as configured. The document is closed
    /// afterwards, or failed if the deferred pass raised a violation.
    pub fn close(&mut self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let trailer = self.complete_catalog()?;
        let result = self.replay_stale_pages();
        self.track(result)?;

        let view = DocumentView {
            catalog: self.catalog,
            trailer: &trailer,
            header_version: self.header_version,
            pages: &self.pages,
            output_intents: &self.output_intents,
        };
        let result = StructureChecker::new(&self.descriptor, &self.store).check_document(&view);
        self.track(result)?;
        let result = self.check_unchecked_objects();
        self.track(result)?;

        let mut writer = self.writer.take().ok_or(Error::DocumentClosed)?;
        let flushed_early = writer.written_count();
        for (reference, object) in self.store.iter() {
            writer.write_object(*reference, object);
        }
        let bytes = writer.finish(&trailer, self.store.size())?;
        self.state = DocumentState::Closed;

        log::info!(
            "Closed {} document: {} pages, {} objects ({} flushed early), {} bytes",
            self.descriptor.level(),
            self.pages.len(),
            self.store.len(),
            flushed_early,
            bytes.len()
        );
        Ok(bytes)
    }

    /// Replay the content of pages whose dictionary, content streams or
    /// bound resources were added raw or changed after their check.
    fn replay_stale_pages(&mut self) -> Result<()> {
        let empty = Dictionary::new();
        for index in 0..self.pages.len() {
            let record = &self.pages[index];
            let object = self.store.fetch(record.reference)?;
            let Some(dict) = object.as_dict() else {
                continue;
            };
            let stale = !self.guard.is_checked(record.reference)
                || page_dependencies(&self.store, dict)
                    .into_iter()
                    .any(|r| !self.guard.is_checked(r));
            if !stale {
                continue;
            }

            let content = page_content(&self.store, dict)?;
            let resources = inherited_resources(&self.store, dict).unwrap_or(&empty);
            let blending = group_blending_profile(&self.store, dict);
            let mut tracker = GraphicsStateTracker::new(&self.descriptor);
            ContentChecker::new(
                &self.descriptor,
                &self.store,
                &mut self.colors,
                &mut tracker,
                record.effective_intents(&self.output_intents),
            )
            .with_blending_profile(blending.as_ref())
            .replay(&content, resources)?;

            self.pages[index].uses_transparency |= tracker.uses_transparency();
            log::debug!("Replayed page {} after changes ({} bytes)", index + 1, content.len());
        }
        Ok(())
    }

    /// Run the per-object check on everything not checked yet: raw
    /// objects nothing flushed and objects changed through `object_mut`.
    fn check_unchecked_objects(&mut self) -> Result<()> {
        let pending: Vec<ObjectRef> = self
            .store
            .iter()
            .map(|(reference, _)| *reference)
            .filter(|r| !self.guard.is_checked(*r) && !self.guard.is_flushed(*r))
            .collect();

        let checker = StructureChecker::new(&self.descriptor, &self.store);
        for reference in &pending {
            checker.check_object(self.store.fetch(*reference)?)?;
        }
        for reference in pending {
            self.guard.mark_checked(reference);
        }
        Ok(())
    }

    /// Write the entries produced at close and build the trailer.
    fn complete_catalog(&mut self) -> Result<Dictionary> {
        let level = self.descriptor.level();

        if !self.output_intents.is_empty() {
            let intents: Vec<Object> = self
                .output_intents
                .iter()
                .map(|intent| intent.to_object(&mut self.store))
                .collect();
            self.catalog_dict_mut()?
                .insert("OutputIntents".to_string(), Object::Array(intents));
        }
        for page in 0..self.pages.len() {
            if self.pages[page].output_intents.is_empty() {
                continue;
            }
            let intents: Vec<Object> = self.pages[page]
                .output_intents
                .iter()
                .map(|intent| intent.to_object(&mut self.store))
                .collect();
            self.page_dict_mut(page)?
                .insert("OutputIntents".to_string(), Object::Array(intents));
        }

        if !self.embedded_files.is_empty() {
            self.write_embedded_file_tree()?;
        }

        if self.descriptor.catalog_version_must_match_header {
            let version = Object::name(self.header_version.to_string());
            self.catalog_dict_mut()?.insert("Version".to_string(), version);
        }

        let now = iso_timestamp();
        if self.config.generate_xmp {
            let mut packet = XmpPacket::new(level)
                .producer(self.config.producer.as_str())
                .create_date(now.as_str())
                .modify_date(now.as_str());
            if let Some(title) = &self.config.title {
                packet = packet.title(title.as_str());
            }
            let metadata = Object::stream(
                [
                    ("Type".to_string(), Object::name("Metadata")),
                    ("Subtype".to_string(), Object::name("XML")),
                ]
                .into_iter()
                .collect(),
                packet.build_bytes(),
            );
            let metadata = self.insert_checked(metadata);
            self.catalog_dict_mut()?
                .insert("Metadata".to_string(), Object::Reference(metadata));
        }

        let mut trailer = Dictionary::new();
        trailer.insert("Root".to_string(), Object::Reference(self.catalog));

        let date = pdf_timestamp();
        let mut info = Dictionary::new();
        if level.part() != PdfAPart::Part4 {
            info.insert("Producer".to_string(), Object::string(&self.config.producer));
            info.insert("CreationDate".to_string(), Object::string(&date));
            if let Some(title) = &self.config.title {
                info.insert("Title".to_string(), Object::string(title));
            }
        }
        info.insert("ModDate".to_string(), Object::string(&date));
        let info = self.insert_checked(Object::Dictionary(info));
        trailer.insert("Info".to_string(), Object::Reference(info));

        if self.config.generate_trailer_id {
            let id = Object::String(file_identifier(level));
            trailer.insert("ID".to_string(), Object::Array(vec![id.clone(), id]));
        }
        Ok(trailer)
    }

    fn write_embedded_file_tree(&mut self) -> Result<()> {
        let mut entries = self.embedded_files.clone();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let names: Vec<Object> = entries
            .iter()
            .flat_map(|(name, spec)| [Object::string(name), Object::Reference(*spec)])
            .collect();
        let tree = self.insert_checked(Object::dict([("Names", Object::Array(names))]));

        // Associated files are listed from part 3 on
        let associated: Vec<Object> = if self.descriptor.part() >= PdfAPart::Part3 {
            self.embedded_files
                .iter()
                .filter(|(_, spec)| {
                    self.store
                        .get(*spec)
                        .and_then(Object::as_dict)
                        .is_some_and(|d| d.contains_key("AFRelationship"))
                })
                .map(|(_, spec)| Object::Reference(*spec))
                .collect()
        } else {
            Vec::new()
        };

        let catalog = self.catalog_dict_mut()?;
        let names = catalog
            .entry("Names".to_string())
            .or_insert_with(|| Object::Dictionary(Dictionary::new()));
        if let Some(names) = names.as_dict_mut() {
            names.insert("EmbeddedFiles".to_string(), Object::Reference(tree));
        }
        if !associated.is_empty() {
            catalog.insert("AF".to_string(), Object::Array(associated));
        }
        Ok(())
    }
}

/// Content streams of a page and the objects bound in its resources.
fn page_dependencies(store: &ObjectStore, page: &Dictionary) -> Vec<ObjectRef> {
    let mut dependencies = match page.get("Contents") {
        Some(Object::Array(items)) => items.iter().filter_map(Object::as_reference).collect(),
        Some(contents) => contents.as_reference().into_iter().collect(),
        None => Vec::new(),
    };
    if let Some(resources) = inherited_resources(store, page) {
        for category in resources.values().filter_map(|c| store.resolve_dict(c)) {
            dependencies.extend(category.values().filter_map(Object::as_reference));
        }
    }
    dependencies
}

/// ICC profiles used by a color space, including alternates and bases.
fn collect_icc_profiles<'a>(space: &'a ColorSpace, out: &mut Vec<&'a IccProfile>) {
    match space {
        ColorSpace::IccBased(profile) => out.push(profile),
        ColorSpace::Separation { alternate, .. } | ColorSpace::DeviceN { alternate, .. } => {
            collect_icc_profiles(alternate, out)
        },
        ColorSpace::Indexed(base) | ColorSpace::Pattern(Some(base)) => collect_icc_profiles(base, out),
        ColorSpace::Device(_) | ColorSpace::CieBased(_) | ColorSpace::Pattern(None) => {},
    }
}

/// Current time as a PDF date string.
pub fn pdf_timestamp() -> String {
    chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
}

/// A fresh 16-byte file identifier.
fn file_identifier(level: PdfALevel) -> Vec<u8> {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(level.to_string().as_bytes());
    hasher.finalize().to_vec()
}
