//! Annotation rule table.
//!
//! Which subtypes may appear, which of them are exempt from the print-flag
//! requirement and from the appearance requirement, and which flags must
//! be clear, for every profile.

use crate::annotation_types::{AnnotationFlags, AnnotationSubtype};
use crate::compliance::types::{PdfALevel, PdfAPart};

use AnnotationSubtype as S;

const PART1_FORBIDDEN: &[AnnotationSubtype] = &[
    S::FileAttachment,
    S::Sound,
    S::Movie,
    S::Screen,
    S::ThreeD,
    S::Watermark,
    S::Redact,
    S::RichMedia,
    S::Caret,
    S::Projection,
];

const PART2_FORBIDDEN: &[AnnotationSubtype] = &[S::Sound, S::Movie, S::Screen, S::ThreeD, S::RichMedia];

const PART4_FORBIDDEN: &[AnnotationSubtype] =
    &[S::Sound, S::Movie, S::Screen, S::FileAttachment, S::ThreeD, S::RichMedia];

const PART4F_FORBIDDEN: &[AnnotationSubtype] = &[S::Movie, S::Screen, S::ThreeD, S::RichMedia];

const PART4E_FORBIDDEN: &[AnnotationSubtype] = &[S::Movie, S::Screen];

/// Annotation rules of one profile.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationRules {
    part: PdfAPart,
    forbidden_subtypes: &'static [AnnotationSubtype],
    print_flag_exempt: &'static [AnnotationSubtype],
    forbidden_flags: AnnotationFlags,
    appearance_required: bool,
    appearance_exempt: &'static [AnnotationSubtype],
    contents_required: bool,
    opacity_restricted: bool,
}

impl AnnotationRules {
    /// Table for a profile.
    pub fn for_level(level: PdfALevel) -> Self {
        let part = level.part();
        let forbidden_subtypes = match level {
            PdfALevel::A1a | PdfALevel::A1b => PART1_FORBIDDEN,
            PdfALevel::A4 => PART4_FORBIDDEN,
            PdfALevel::A4f => PART4F_FORBIDDEN,
            PdfALevel::A4e => PART4E_FORBIDDEN,
            _ => PART2_FORBIDDEN,
        };
        // Exemption table from the print-flag rule, per part
        let print_flag_exempt: &'static [AnnotationSubtype] = match part {
            PdfAPart::Part1 => &[],
            PdfAPart::Part2 | PdfAPart::Part3 => &[S::Popup],
            PdfAPart::Part4 => &[S::Popup, S::Link],
        };
        let mut forbidden_flags =
            AnnotationFlags::HIDDEN | AnnotationFlags::INVISIBLE | AnnotationFlags::NO_VIEW;
        if part != PdfAPart::Part1 {
            forbidden_flags |= AnnotationFlags::TOGGLE_NO_VIEW;
        }

        Self {
            part,
            forbidden_subtypes,
            print_flag_exempt,
            forbidden_flags,
            appearance_required: part != PdfAPart::Part1,
            appearance_exempt: &[S::Popup, S::Link],
            contents_required: level.requires_structure(),
            opacity_restricted: part == PdfAPart::Part1,
        }
    }

    /// The part this table belongs to.
    pub fn part(&self) -> PdfAPart {
        self.part
    }

    /// Whether a subtype may appear at all. Subtypes unknown to ISO 32000
    /// never may.
    pub fn is_subtype_allowed(&self, subtype: AnnotationSubtype) -> bool {
        subtype != S::Unknown && !self.forbidden_subtypes.contains(&subtype)
    }

    /// Whether the subtype must have the Print flag set.
    pub fn requires_print_flag(&self, subtype: AnnotationSubtype) -> bool {
        !self.print_flag_exempt.contains(&subtype)
    }

    /// Flags that must be clear, in reporting order.
    pub fn forbidden_flags(&self) -> impl Iterator<Item = AnnotationFlags> + '_ {
        [
            AnnotationFlags::INVISIBLE,
            AnnotationFlags::HIDDEN,
            AnnotationFlags::NO_VIEW,
            AnnotationFlags::TOGGLE_NO_VIEW,
        ]
        .into_iter()
        .filter(move |f| self.forbidden_flags.contains(*f))
    }

    /// Whether an annotation needs an appearance dictionary. Zero-area
    /// annotations never do.
    pub fn requires_appearance(&self, subtype: AnnotationSubtype, zero_area: bool) -> bool {
        self.appearance_required && !zero_area && !self.appearance_exempt.contains(&subtype)
    }

    /// Whether an annotation without normal appearance needs /Contents.
    pub fn requires_contents(&self, subtype: AnnotationSubtype) -> bool {
        self.contents_required && subtype != S::Popup
    }

    /// Whether /CA must be 1.0.
    pub fn opacity_restricted(&self) -> bool {
        self.opacity_restricted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part1_forbidden_subtypes() {
        let rules = AnnotationRules::for_level(PdfALevel::A1b);
        assert!(!rules.is_subtype_allowed(S::FileAttachment));
        assert!(!rules.is_subtype_allowed(S::Caret));
        assert!(rules.is_subtype_allowed(S::Link));
        assert!(!rules.is_subtype_allowed(S::Unknown));
    }

    #[test]
    fn test_part4_variants() {
        let general = AnnotationRules::for_level(PdfALevel::A4);
        let f = AnnotationRules::for_level(PdfALevel::A4f);
        let e = AnnotationRules::for_level(PdfALevel::A4e);
        assert!(!general.is_subtype_allowed(S::FileAttachment));
        assert!(f.is_subtype_allowed(S::FileAttachment));
        assert!(f.is_subtype_allowed(S::Sound));
        assert!(!f.is_subtype_allowed(S::ThreeD));
        assert!(e.is_subtype_allowed(S::ThreeD));
        assert!(e.is_subtype_allowed(S::RichMedia));
        assert!(!e.is_subtype_allowed(S::Movie));
    }

    #[test]
    fn test_print_flag_exemptions_by_part() {
        assert!(AnnotationRules::for_level(PdfALevel::A1b).requires_print_flag(S::Popup));
        assert!(!AnnotationRules::for_level(PdfALevel::A2b).requires_print_flag(S::Popup));
        assert!(AnnotationRules::for_level(PdfALevel::A3b).requires_print_flag(S::Link));
        assert!(!AnnotationRules::for_level(PdfALevel::A4).requires_print_flag(S::Link));
    }

    #[test]
    fn test_toggle_no_view_only_from_part2() {
        let part1: Vec<_> = AnnotationRules::for_level(PdfALevel::A1b).forbidden_flags().collect();
        let part2: Vec<_> = AnnotationRules::for_level(PdfALevel::A2b).forbidden_flags().collect();
        assert!(!part1.contains(&AnnotationFlags::TOGGLE_NO_VIEW));
        assert!(part2.contains(&AnnotationFlags::TOGGLE_NO_VIEW));
        assert_eq!(part2.len(), 4);
    }

    #[test]
    fn test_appearance_requirement() {
        let part1 = AnnotationRules::for_level(PdfALevel::A1b);
        let part2 = AnnotationRules::for_level(PdfALevel::A2b);
        assert!(!part1.requires_appearance(S::Text, false));
        assert!(part2.requires_appearance(S::Text, false));
        assert!(!part2.requires_appearance(S::Text, true));
        assert!(!part2.requires_appearance(S::Link, false));
    }

    #[test]
    fn test_contents_only_for_tagged_levels() {
        assert!(AnnotationRules::for_level(PdfALevel::A2a).requires_contents(S::Text));
        assert!(!AnnotationRules::for_level(PdfALevel::A2a).requires_contents(S::Popup));
        assert!(!AnnotationRules::for_level(PdfALevel::A2b).requires_contents(S::Text));
    }
}
