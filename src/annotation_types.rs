//! Annotation subtypes and flags (ISO 32000-2, 12.5).

use bitflags::bitflags;

macro_rules! annotation_subtypes {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// Annotation subtype as named by the /Subtype entry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AnnotationSubtype {
            $($(#[$doc])* $variant,)*
            /// Subtype not defined by ISO 32000
            Unknown,
        }

        impl AnnotationSubtype {
            /// PDF name of this subtype.
            pub fn pdf_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Unknown => "Unknown",
                }
            }

            /// Parse from a PDF name. Names outside ISO 32000 map to
            /// [`AnnotationSubtype::Unknown`].
            pub fn from_pdf_name(name: &str) -> Self {
                match name {
                    $($name => Self::$variant,)*
                    _ => Self::Unknown,
                }
            }
        }
    };
}

annotation_subtypes! {
    /// Sticky note
    Text => "Text",
    /// Hyperlink
    Link => "Link",
    /// Free text
    FreeText => "FreeText",
    /// Line
    Line => "Line",
    /// Square
    Square => "Square",
    /// Circle
    Circle => "Circle",
    /// Polygon
    Polygon => "Polygon",
    /// Polyline
    PolyLine => "PolyLine",
    /// Highlight markup
    Highlight => "Highlight",
    /// Underline markup
    Underline => "Underline",
    /// Squiggly underline markup
    Squiggly => "Squiggly",
    /// Strike-out markup
    StrikeOut => "StrikeOut",
    /// Rubber stamp
    Stamp => "Stamp",
    /// Caret
    Caret => "Caret",
    /// Freehand ink
    Ink => "Ink",
    /// Pop-up window
    Popup => "Popup",
    /// Attached file
    FileAttachment => "FileAttachment",
    /// Sound
    Sound => "Sound",
    /// Movie
    Movie => "Movie",
    /// Interactive form widget
    Widget => "Widget",
    /// Screen (media)
    Screen => "Screen",
    /// Printer's mark
    PrinterMark => "PrinterMark",
    /// Trap network
    TrapNet => "TrapNet",
    /// Watermark
    Watermark => "Watermark",
    /// 3D artwork
    ThreeD => "3D",
    /// Redaction
    Redact => "Redact",
    /// Rich media
    RichMedia => "RichMedia",
    /// Projection (PDF 2.0)
    Projection => "Projection",
}

bitflags! {
    /// Annotation flags, the /F entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnnotationFlags: u32 {
        /// Do not render if no handler is available
        const INVISIBLE = 1 << 0;
        /// Do not render or print
        const HIDDEN = 1 << 1;
        /// Print the annotation
        const PRINT = 1 << 2;
        /// Do not scale with page zoom
        const NO_ZOOM = 1 << 3;
        /// Do not rotate with page
        const NO_ROTATE = 1 << 4;
        /// Do not render on screen
        const NO_VIEW = 1 << 5;
        /// Do not allow interaction
        const READ_ONLY = 1 << 6;
        /// Do not allow deletion or property changes
        const LOCKED = 1 << 7;
        /// Invert NoView on certain events
        const TOGGLE_NO_VIEW = 1 << 8;
        /// Do not allow contents changes
        const LOCKED_CONTENTS = 1 << 9;
    }
}

impl AnnotationFlags {
    /// Name of a single flag, used in diagnostics.
    pub fn flag_name(flag: AnnotationFlags) -> &'static str {
        match flag {
            f if f == Self::INVISIBLE => "Invisible",
            f if f == Self::HIDDEN => "Hidden",
            f if f == Self::PRINT => "Print",
            f if f == Self::NO_ZOOM => "NoZoom",
            f if f == Self::NO_ROTATE => "NoRotate",
            f if f == Self::NO_VIEW => "NoView",
            f if f == Self::READ_ONLY => "ReadOnly",
            f if f == Self::LOCKED => "Locked",
            f if f == Self::TOGGLE_NO_VIEW => "ToggleNoView",
            f if f == Self::LOCKED_CONTENTS => "LockedContents",
            _ => "Unknown",
        }
    }

    /// Flags from an /F value; unknown bits are kept.
    pub fn from_value(value: i64) -> Self {
        Self::from_bits_retain(value as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_subtype_names() {
        assert_eq!(AnnotationSubtype::from_pdf_name("3D"), AnnotationSubtype::ThreeD);
        assert_eq!(AnnotationSubtype::ThreeD.pdf_name(), "3D");
        assert_eq!(AnnotationSubtype::from_pdf_name("Bogus"), AnnotationSubtype::Unknown);
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(AnnotationFlags::PRINT.bits(), 4);
        assert_eq!(AnnotationFlags::TOGGLE_NO_VIEW.bits(), 256);
        let flags = AnnotationFlags::from_value(4 | 2);
        assert!(flags.contains(AnnotationFlags::PRINT));
        assert!(flags.contains(AnnotationFlags::HIDDEN));
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(AnnotationFlags::flag_name(AnnotationFlags::NO_VIEW), "NoView");
        assert_eq!(AnnotationFlags::flag_name(AnnotationFlags::PRINT | AnnotationFlags::HIDDEN), "Unknown");
    }

    proptest! {
        #[test]
        fn prop_flag_bits_survive(value in 0u32..1024) {
            let flags = AnnotationFlags::from_value(value as i64);
            prop_assert_eq!(flags.bits(), value);
            prop_assert_eq!(flags.contains(AnnotationFlags::PRINT), value & 4 != 0);
        }
    }
}
