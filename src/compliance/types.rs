//! PDF/A profile identifiers and file versions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// PDF/A profile: a part together with its conformance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfALevel {
    /// PDF/A-1a: Full conformance with logical structure
    A1a,
    /// PDF/A-1b: Basic conformance (visual preservation)
    A1b,
    /// PDF/A-2a: PDF 1.7 based, full conformance
    A2a,
    /// PDF/A-2b: PDF 1.7 based, basic conformance
    A2b,
    /// PDF/A-2u: PDF/A-2b plus Unicode mapping
    A2u,
    /// PDF/A-3a: PDF/A-2a plus arbitrary embedded files
    A3a,
    /// PDF/A-3b: PDF/A-2b plus arbitrary embedded files
    A3b,
    /// PDF/A-3u: PDF/A-3b plus Unicode mapping
    A3u,
    /// PDF/A-4: PDF 2.0 based, general level
    A4,
    /// PDF/A-4e: engineering documents, rich media and 3D allowed
    A4e,
    /// PDF/A-4f: at least one embedded file, any type
    A4f,
}

impl PdfALevel {
    /// All built-in profiles.
    pub const ALL: [PdfALevel; 11] = [
        PdfALevel::A1a,
        PdfALevel::A1b,
        PdfALevel::A2a,
        PdfALevel::A2b,
        PdfALevel::A2u,
        PdfALevel::A3a,
        PdfALevel::A3b,
        PdfALevel::A3u,
        PdfALevel::A4,
        PdfALevel::A4e,
        PdfALevel::A4f,
    ];

    /// Get the PDF/A part.
    pub fn part(&self) -> PdfAPart {
        match self {
            PdfALevel::A1a | PdfALevel::A1b => PdfAPart::Part1,
            PdfALevel::A2a | PdfALevel::A2b | PdfALevel::A2u => PdfAPart::Part2,
            PdfALevel::A3a | PdfALevel::A3b | PdfALevel::A3u => PdfAPart::Part3,
            PdfALevel::A4 | PdfALevel::A4e | PdfALevel::A4f => PdfAPart::Part4,
        }
    }

    /// Get the conformance level.
    pub fn conformance(&self) -> ConformanceLevel {
        match self {
            PdfALevel::A1a | PdfALevel::A2a | PdfALevel::A3a => ConformanceLevel::Accessible,
            PdfALevel::A1b | PdfALevel::A2b | PdfALevel::A3b => ConformanceLevel::Basic,
            PdfALevel::A2u | PdfALevel::A3u => ConformanceLevel::Unicode,
            PdfALevel::A4 => ConformanceLevel::General,
            PdfALevel::A4e => ConformanceLevel::Extended,
            PdfALevel::A4f => ConformanceLevel::FileAttachment,
        }
    }

    /// Check if this level requires logical structure (Tagged PDF).
    pub fn requires_structure(&self) -> bool {
        self.conformance() == ConformanceLevel::Accessible
    }

    /// Check if this level requires Unicode mapping for every font.
    pub fn requires_unicode(&self) -> bool {
        matches!(
            self.conformance(),
            ConformanceLevel::Accessible | ConformanceLevel::Unicode
        ) || self.part() == PdfAPart::Part4
    }

    /// Get the XMP pdfaid:part value.
    pub fn xmp_part(&self) -> &'static str {
        match self.part() {
            PdfAPart::Part1 => "1",
            PdfAPart::Part2 => "2",
            PdfAPart::Part3 => "3",
            PdfAPart::Part4 => "4",
        }
    }

    /// Get the XMP pdfaid:conformance value, absent for the general part 4 level.
    pub fn xmp_conformance(&self) -> Option<&'static str> {
        match self.conformance() {
            ConformanceLevel::Accessible => Some("A"),
            ConformanceLevel::Basic => Some("B"),
            ConformanceLevel::Unicode => Some("U"),
            ConformanceLevel::General => None,
            ConformanceLevel::Extended => Some("E"),
            ConformanceLevel::FileAttachment => Some("F"),
        }
    }

    /// Parse from XMP pdfaid:part and pdfaid:conformance values.
    pub fn from_xmp(part: &str, conformance: Option<&str>) -> Option<Self> {
        let conformance = conformance.map(|c| c.trim().to_uppercase());
        match (part.trim(), conformance.as_deref()) {
            ("1", Some("A")) => Some(PdfALevel::A1a),
            ("1", Some("B")) => Some(PdfALevel::A1b),
            ("2", Some("A")) => Some(PdfALevel::A2a),
            ("2", Some("B")) => Some(PdfALevel::A2b),
            ("2", Some("U")) => Some(PdfALevel::A2u),
            ("3", Some("A")) => Some(PdfALevel::A3a),
            ("3", Some("B")) => Some(PdfALevel::A3b),
            ("3", Some("U")) => Some(PdfALevel::A3u),
            ("4", None) => Some(PdfALevel::A4),
            ("4", Some("E")) => Some(PdfALevel::A4e),
            ("4", Some("F")) => Some(PdfALevel::A4f),
            _ => None,
        }
    }
}

impl fmt::Display for PdfALevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PdfALevel::A1a => "PDF/A-1a",
            PdfALevel::A1b => "PDF/A-1b",
            PdfALevel::A2a => "PDF/A-2a",
            PdfALevel::A2b => "PDF/A-2b",
            PdfALevel::A2u => "PDF/A-2u",
            PdfALevel::A3a => "PDF/A-3a",
            PdfALevel::A3b => "PDF/A-3b",
            PdfALevel::A3u => "PDF/A-3u",
            PdfALevel::A4 => "PDF/A-4",
            PdfALevel::A4e => "PDF/A-4e",
            PdfALevel::A4f => "PDF/A-4f",
        };
        write!(f, "{}", name)
    }
}

/// PDF/A part (version).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PdfAPart {
    /// PDF/A-1 (based on PDF 1.4)
    Part1,
    /// PDF/A-2 (based on PDF 1.7)
    Part2,
    /// PDF/A-3 (based on PDF 1.7, with embedded files)
    Part3,
    /// PDF/A-4 (based on PDF 2.0)
    Part4,
}

impl fmt::Display for PdfAPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfAPart::Part1 => write!(f, "PDF/A-1"),
            PdfAPart::Part2 => write!(f, "PDF/A-2"),
            PdfAPart::Part3 => write!(f, "PDF/A-3"),
            PdfAPart::Part4 => write!(f, "PDF/A-4"),
        }
    }
}

/// Conformance level within a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConformanceLevel {
    /// Level b
    Basic,
    /// Level a: tagged, Unicode text
    Accessible,
    /// Level u: Unicode text
    Unicode,
    /// Part 4 without a variant
    General,
    /// Part 4e
    Extended,
    /// Part 4f
    FileAttachment,
}

/// A PDF file format version, as written in the header and the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PdfVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl PdfVersion {
    /// PDF 1.4
    pub const V1_4: PdfVersion = PdfVersion::new(1, 4);
    /// PDF 1.7
    pub const V1_7: PdfVersion = PdfVersion::new(1, 7);
    /// PDF 2.0
    pub const V2_0: PdfVersion = PdfVersion::new(2, 0);

    /// Create a version.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parse "1.7" or "2.0".
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.trim().split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
