// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # pdfa_conformance
//!
//! A conformance engine for the PDF/A archival profiles: parts 1, 2, 3
//! and 4 with their conformance levels.
//!
//! ## How it works
//!
//! - **Immediate checks**: every authoring call (adding an annotation, a
//!   font, an action, an output intent, drawing on a canvas) is checked
//!   against the profile before it changes the document.
//! - **Deferred pass**: closing the document runs one structural pass over
//!   the catalog, pages, annotations, actions, metadata and trailer.
//! - **Fail fast**: the first broken rule is returned as
//!   [`Error::Conformance`] with a stable rule code, and the document is
//!   unusable afterwards.
//! - **Read-validate**: [`PdfAValidator`] re-opens finished bytes, replays
//!   every page through the same content checks, then runs the same
//!   deferred pass.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfa_conformance::{PdfALevel, PdfAValidator, PdfDocument};
//!
//! let mut doc = PdfDocument::new(PdfALevel::A3b)?;
//! let page = doc.add_page(595.0, 842.0)?;
//! let mut canvas = doc.canvas(page)?;
//! canvas.save_state()?;
//! canvas.restore_state()?;
//! canvas.finish()?;
//!
//! let bytes = doc.close()?;
//! PdfAValidator::new(PdfALevel::A3b).validate_bytes(&bytes)?;
//! # Ok::<(), pdfa_conformance::Error>(())
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Object model and parsing
pub mod lexer;
pub mod object;
pub mod parser;
pub mod store;

// Annotation vocabulary
pub mod annotation_types;

// Color management
pub mod color;

// Conformance rules and checkers
pub mod compliance;

// Content streams
pub mod content;

// Serialization and reading
pub mod reader;
pub mod writer;

// XMP metadata
pub mod xmp;

// Authoring
pub mod config;
pub mod document;
pub mod flush;

// Re-exports
pub use annotation_types::{AnnotationFlags, AnnotationSubtype};
pub use color::{ColorSpace, ColorSpaceFamily, IccProfile, OutputIntent};
pub use compliance::{
    ConformanceViolation, PdfALevel, PdfAPart, PdfAValidator, PdfVersion, ProfileDescriptor, RuleId,
};
pub use config::{DocumentConfig, ValidatorOptions};
pub use content::{Canvas, ContentOp};
pub use document::{EmbeddedFile, PdfDocument, ResourceKind};
pub use error::{Error, Result};
pub use flush::ObjectFlushGuard;
pub use object::{Dictionary, Object, ObjectRef};
pub use store::ObjectStore;
