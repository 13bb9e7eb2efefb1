//! Font rule table.

use crate::compliance::types::{PdfALevel, PdfAPart};

/// Encodings a non-symbolic TrueType font may name.
pub const NON_SYMBOLIC_TRUETYPE_ENCODINGS: &[&str] = &["MacRomanEncoding", "WinAnsiEncoding"];

/// Font rules of one profile.
#[derive(Debug, Clone, Copy)]
pub struct FontRules {
    /// Every font except Type 3 must embed its program
    pub require_embedding: bool,
    /// Every font needs a ToUnicode CMap
    pub require_to_unicode: bool,
    /// Subset CIDFonts need a CIDSet stream
    pub require_cid_set_for_subsets: bool,
    /// Subset Type 1 fonts need a CharSet string
    pub require_char_set_for_subsets: bool,
    /// Symbolic TrueType fonts must not carry an Encoding
    pub forbid_symbolic_truetype_encoding: bool,
}

impl FontRules {
    /// Table for a profile.
    pub fn for_level(level: PdfALevel) -> Self {
        let part1 = level.part() == PdfAPart::Part1;
        Self {
            require_embedding: true,
            require_to_unicode: level.requires_unicode(),
            require_cid_set_for_subsets: part1,
            require_char_set_for_subsets: part1,
            forbid_symbolic_truetype_encoding: part1,
        }
    }

    /// Whether `encoding` is acceptable for a non-symbolic TrueType font.
    pub fn non_symbolic_encoding_allowed(&self, encoding: &str) -> bool {
        NON_SYMBOLIC_TRUETYPE_ENCODINGS.contains(&encoding)
    }
}
