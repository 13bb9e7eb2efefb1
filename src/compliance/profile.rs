//! Per-profile descriptors.
//!
//! A [`ProfileDescriptor`] is plain data looked up by [`PdfALevel`]. Checkers
//! consult its flags and limits instead of branching on the part number
//! themselves; the per-object rule tables are reached through it as well.

use super::rules::{ActionRules, AnnotationRules, EmbeddedFileRules, FontRules};
use super::types::{PdfALevel, PdfAPart, PdfVersion};

/// Maximum nesting of q/Q in every PDF/A part.
pub const MAX_GRAPHICS_STATE_DEPTH: usize = 28;

/// Maximum number of indirect objects in a PDF/A file.
pub const MAX_INDIRECT_OBJECTS: usize = 8_388_607;

/// Whether transparency constructs may appear at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransparencyPolicy {
    /// Soft masks, alpha and non-normal blend modes are violations
    Forbidden,
    /// Allowed, subject to the page group rules
    Allowed,
}

/// Immutable rule data for one profile.
#[derive(Debug, Clone)]
pub struct ProfileDescriptor {
    level: PdfALevel,
    /// Lowest permitted header version
    pub min_header_version: PdfVersion,
    /// Highest permitted header version
    pub max_header_version: PdfVersion,
    /// Version written when the author does not pick one
    pub default_header_version: PdfVersion,
    /// Maximum q nesting
    pub max_graphics_state_depth: usize,
    /// Maximum number of indirect objects
    pub max_indirect_objects: usize,
    /// Transparency policy
    pub transparency: TransparencyPolicy,
    /// Device color may be used without intent or default color space
    pub unchecked_device_color: bool,
    /// Highest ICC profile major version accepted
    pub max_icc_major_version: u8,
    /// JPXDecode images allowed
    pub jpeg2000_allowed: bool,
    /// OCProperties allowed
    pub optional_content_allowed: bool,
    /// HTO key forbidden in ExtGState
    pub halftone_origin_forbidden: bool,
    /// Tagged structure (MarkInfo, StructTreeRoot, Lang) required
    pub requires_tagging: bool,
    /// Every font needs a ToUnicode CMap
    pub requires_unicode: bool,
    /// Info dictionary may hold only ModDate (unless PieceInfo is present)
    pub restrict_document_info: bool,
    /// Catalog Version must equal the header version
    pub catalog_version_must_match_header: bool,
}

impl ProfileDescriptor {
    /// Descriptor of a built-in profile.
    pub fn for_level(level: PdfALevel) -> Self {
        let part = level.part();
        let (min_header_version, max_header_version, default_header_version) = match part {
            PdfAPart::Part1 => (PdfVersion::new(1, 0), PdfVersion::V1_4, PdfVersion::V1_4),
            PdfAPart::Part2 | PdfAPart::Part3 => {
                (PdfVersion::new(1, 0), PdfVersion::V1_7, PdfVersion::V1_7)
            },
            PdfAPart::Part4 => (PdfVersion::V2_0, PdfVersion::new(2, 9), PdfVersion::V2_0),
        };

        Self {
            level,
            min_header_version,
            max_header_version,
            default_header_version,
            max_graphics_state_depth: MAX_GRAPHICS_STATE_DEPTH,
            max_indirect_objects: MAX_INDIRECT_OBJECTS,
            transparency: if part == PdfAPart::Part1 {
                TransparencyPolicy::Forbidden
            } else {
                TransparencyPolicy::Allowed
            },
            unchecked_device_color: false,
            max_icc_major_version: if part == PdfAPart::Part1 { 2 } else { 4 },
            jpeg2000_allowed: part != PdfAPart::Part1,
            optional_content_allowed: part != PdfAPart::Part1,
            halftone_origin_forbidden: part != PdfAPart::Part1,
            requires_tagging: level.requires_structure(),
            requires_unicode: level.requires_unicode(),
            restrict_document_info: part == PdfAPart::Part4,
            catalog_version_must_match_header: part == PdfAPart::Part4,
        }
    }

    /// Permit device color everywhere. Built-in profiles never do; private
    /// overlays that relax color management use this.
    pub fn with_unchecked_device_color(mut self, unchecked: bool) -> Self {
        self.unchecked_device_color = unchecked;
        self
    }

    /// The profile this descriptor describes.
    pub fn level(&self) -> PdfALevel {
        self.level
    }

    /// The part of the profile.
    pub fn part(&self) -> PdfAPart {
        self.level.part()
    }

    /// Whether transparency is allowed.
    pub fn allows_transparency(&self) -> bool {
        self.transparency == TransparencyPolicy::Allowed
    }

    /// Whether `version` may appear in the file header.
    pub fn header_version_allowed(&self, version: PdfVersion) -> bool {
        version >= self.min_header_version && version <= self.max_header_version
    }

    /// Action table for this profile.
    pub fn action_rules(&self) -> &'static ActionRules {
        ActionRules::for_part(self.part())
    }

    /// Annotation table for this profile.
    pub fn annotation_rules(&self) -> AnnotationRules {
        AnnotationRules::for_level(self.level)
    }

    /// Font table for this profile.
    pub fn font_rules(&self) -> FontRules {
        FontRules::for_level(self.level)
    }

    /// Embedded-file table for this profile.
    pub fn embedded_file_rules(&self) -> EmbeddedFileRules {
        EmbeddedFileRules::for_level(self.level)
    }
}
