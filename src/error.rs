//! Error types for the conformance engine.
//!
//! Conformance failures and plain usage/parsing failures share one error
//! type so every fallible call returns `Result<T>`. A conformance failure is
//! always the [`Error::Conformance`] variant and carries the classified
//! [`ConformanceViolation`].

use crate::compliance::ConformanceViolation;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while authoring, serializing or validating.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)] // "Invalid" prefix is intentional for clarity
pub enum Error {
    /// A PDF/A rule of the active profile was broken
    #[error("PDF/A conformance violation: {0}")]
    Conformance(#[from] ConformanceViolation),

    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Referenced object not found in the object store
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// A content operator named a resource absent from the resource dictionary
    #[error("Resource /{name} not found in {category} resources")]
    MissingResource {
        /// Resource category (ExtGState, XObject, ...)
        category: String,
        /// Resource name
        name: String,
    },

    /// Page index out of range
    #[error("Page {0} does not exist")]
    UnknownPage(usize),

    /// Attempt to modify an object that was already written out
    #[error("Object {0} has already been flushed and is immutable")]
    ObjectAlreadyFlushed(crate::object::ObjectRef),

    /// The document raised a conformance violation earlier and cannot be used
    #[error("Document is unusable after a conformance violation")]
    DocumentFailed,

    /// The document was already closed
    #[error("Document has already been closed")]
    DocumentClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// XMP packet could not be read
    #[error("XMP metadata error: {0}")]
    Xmp(String),
}

impl Error {
    /// The violation carried by this error, if it is a conformance failure.
    pub fn violation(&self) -> Option<&ConformanceViolation> {
        match self {
            Error::Conformance(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if this error is a conformance failure.
    pub fn is_conformance(&self) -> bool {
        matches!(self, Error::Conformance(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xmp(err.to_string())
    }
}
