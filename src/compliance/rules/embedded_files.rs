//! Embedded-file rule table.

use crate::compliance::types::{PdfALevel, PdfAPart};

/// What may be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedFilePolicy {
    /// No embedded files at all
    Forbidden,
    /// Only PDF files, unless the relationship is Source
    ArchivalOnly,
    /// Any file type
    Unrestricted,
}

/// Embedded-file rules of one profile.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFileRules {
    /// What may be embedded
    pub policy: EmbeddedFilePolicy,
    /// File specifications need both F and UF
    pub require_file_names: bool,
    /// File specifications need AFRelationship
    pub require_relationship: bool,
    /// Embedded file streams need a MIME Subtype
    pub require_mime_type: bool,
    /// Embedded file streams need Params/ModDate
    pub require_mod_date: bool,
    /// The document must embed at least one file
    pub require_at_least_one: bool,
}

impl EmbeddedFileRules {
    /// Table for a profile.
    pub fn for_level(level: PdfALevel) -> Self {
        let part = level.part();
        let policy = match level {
            PdfALevel::A1a | PdfALevel::A1b => EmbeddedFilePolicy::Forbidden,
            PdfALevel::A2a | PdfALevel::A2b | PdfALevel::A2u | PdfALevel::A4 => {
                EmbeddedFilePolicy::ArchivalOnly
            },
            _ => EmbeddedFilePolicy::Unrestricted,
        };
        let associated_files = matches!(part, PdfAPart::Part3 | PdfAPart::Part4);
        Self {
            policy,
            require_file_names: part != PdfAPart::Part1,
            require_relationship: associated_files,
            require_mime_type: associated_files,
            require_mod_date: associated_files,
            require_at_least_one: level == PdfALevel::A4f,
        }
    }

    /// Whether a payload with `mime_type` and `relationship` may be embedded.
    pub fn payload_allowed(&self, mime_type: Option<&str>, relationship: Option<&str>) -> bool {
        match self.policy {
            EmbeddedFilePolicy::Forbidden => false,
            EmbeddedFilePolicy::Unrestricted => true,
            EmbeddedFilePolicy::ArchivalOnly => {
                relationship == Some("Source") || mime_type == Some("application/pdf")
            },
        }
    }
}
