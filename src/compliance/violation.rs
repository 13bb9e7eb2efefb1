//! Classified conformance violations.
//!
//! Every rule the engine enforces has a [`RuleId`] with a stable code and a
//! message template. Templates use `{0}`, `{1}`, ... placeholders that are
//! filled from the violation parameters.

use super::types::PdfALevel;
use crate::error::{Error, Result};
use std::fmt;

macro_rules! rules {
    ($( $(#[$doc:meta])* $variant:ident => ($code:literal, $template:literal), )*) => {
        /// Identifier of a single conformance rule.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RuleId {
            $( $(#[$doc])* $variant, )*
        }

        impl RuleId {
            /// Stable diagnostic code, e.g. "ACTION-001".
            pub fn code(&self) -> &'static str {
                match self {
                    $( RuleId::$variant => $code, )*
                }
            }

            /// Message template with `{n}` placeholders.
            pub fn template(&self) -> &'static str {
                match self {
                    $( RuleId::$variant => $template, )*
                }
            }
        }
    };
}

rules! {
    // Graphics state
    /// Nested save-state beyond the profile limit
    GraphicsStateStackDepthExceeded => ("GSTATE-001", "Graphics state stack depth is greater than {0}"),
    /// Restore-state with an empty stack
    UnbalancedRestoreState => ("GSTATE-002", "Restore state operator without a matching save state"),

    // Color
    /// Device color used without a matching output intent or default color space
    DeviceColorNotPermitted => ("COLOR-001", "{0} may be used only if the file has a matching PDF/A output intent or a {1} color space in the usage context"),
    /// Two device families in a file without output intent
    DeviceColorsMixedWithoutOutputIntent => ("COLOR-002", "Device color spaces {0} and {1} shall not both be used in a file without a PDF/A output intent"),
    /// ICC profile duplicating the output intent or blending profile
    DuplicateIccProfile => ("COLOR-003", "ICCBased color space {0} embeds the same ICC profile as the {1} in scope"),
    /// /N disagrees with the profile header
    IccComponentCountMismatch => ("COLOR-004", "ICCBased color space declares {0} components but its profile describes {1}"),
    /// Profile version above the profile maximum
    IccProfileVersionNotSupported => ("COLOR-005", "ICC profile version {0} is not supported, the maximum major version is {1}"),
    /// Output intent without DestOutputProfile
    OutputIntentProfileMissing => ("COLOR-006", "A PDF/A output intent shall contain a DestOutputProfile"),
    /// Differing destination profiles
    OutputIntentProfilesDiffer => ("COLOR-007", "All PDF/A output intents with a DestOutputProfile shall use the same ICC profile"),
    /// Output intent profile device class not prtr/mntr
    OutputIntentDeviceClassNotAllowed => ("COLOR-008", "ICC profile device class {0} is not permitted for a PDF/A output intent"),

    // Transparency and ExtGState
    /// Transparency construct in a profile that forbids transparency
    TransparencyNotAllowed => ("XGS-001", "Transparency is not allowed in this profile: {0}"),
    /// Blend mode outside the permitted set
    BlendModeNotAllowed => ("XGS-002", "Blend mode {0} is not allowed"),
    /// TR key in ExtGState
    TransferFunctionNotAllowed => ("XGS-003", "An ExtGState dictionary shall not contain the TR key"),
    /// TR2 other than Default
    TransferFunction2NotAllowed => ("XGS-004", "An ExtGState TR2 value shall be Default, found {0}"),
    /// HTO key in ExtGState
    HalftoneOriginNotAllowed => ("XGS-005", "An ExtGState dictionary shall not contain the HTO key"),
    /// Non-standard rendering intent
    RenderingIntentNotAllowed => ("XGS-006", "Rendering intent {0} is not allowed"),
    /// Transparency on a page without blending color space or output intent
    PageTransparencyGroupRequired => ("XGS-007", "Page {0} uses transparency but has neither a transparency group with a CS entry nor a PDF/A output intent"),

    // XObjects and images
    /// Forbidden stream filter
    FilterNotAllowed => ("XOBJ-001", "Filter {0} is not allowed"),
    /// Image Interpolate true
    ImageInterpolationNotAllowed => ("XOBJ-002", "The Interpolate key of image {0} shall not be true"),
    /// Image Alternates
    ImageAlternatesNotAllowed => ("XOBJ-003", "Image {0} shall not contain an Alternates key"),
    /// OPI key
    OpiNotAllowed => ("XOBJ-004", "XObject {0} shall not contain an OPI key"),
    /// PostScript XObject or PS key
    PostScriptXObjectNotAllowed => ("XOBJ-005", "PostScript XObject {0} is not allowed"),
    /// Reference XObject
    ReferenceXObjectNotAllowed => ("XOBJ-006", "Reference XObject {0} is not allowed"),

    // Fonts
    /// Font program missing
    FontNotEmbedded => ("FONT-001", "All fonts shall be embedded, font {0} is not"),
    /// No ToUnicode CMap where required
    FontMissingToUnicode => ("FONT-002", "Font {0} shall have a ToUnicode CMap"),
    /// Non-symbolic TrueType with wrong encoding
    NonSymbolicTrueTypeEncoding => ("FONT-003", "Non-symbolic TrueType font {0} shall use MacRomanEncoding or WinAnsiEncoding"),
    /// Symbolic TrueType with Encoding
    SymbolicTrueTypeEncoding => ("FONT-004", "Symbolic TrueType font {0} shall not specify an Encoding"),
    /// Subset CIDFont without CIDSet
    SubsetCidFontMissingCidSet => ("FONT-005", "Subset CIDFont {0} shall contain a CIDSet stream"),
    /// Subset Type 1 without CharSet
    SubsetType1MissingCharSet => ("FONT-006", "Subset Type 1 font {0} shall contain a CharSet string"),

    // Actions
    /// Forbidden action type
    ActionNotAllowed => ("ACTION-001", "{0} actions are not allowed"),
    /// Named action outside the permitted set
    NamedActionNotAllowed => ("ACTION-002", "Named action {0} is not allowed"),
    /// AA dictionary trigger outside the permitted set
    AdditionalActionsKeyNotAllowed => ("ACTION-003", "AA dictionary shall contain only allowed keys, found {0}"),
    /// Catalog AA
    CatalogAdditionalActionsNotAllowed => ("ACTION-004", "The document catalog shall not include an AA entry"),
    /// Page AA
    PageAdditionalActionsNotAllowed => ("ACTION-005", "A page dictionary shall not include an AA entry"),
    /// Widget or field with A
    WidgetActionNotAllowed => ("ACTION-006", "A widget annotation or form field dictionary shall not include an A entry"),
    /// JavaScript name tree
    JavaScriptNotAllowed => ("ACTION-007", "The document name dictionary shall not contain a JavaScript entry"),

    // Annotations
    /// Forbidden annotation subtype
    AnnotationTypeNotAllowed => ("ANNOT-001", "{0} annotations are not allowed"),
    /// Print flag not set
    AnnotationPrintFlagRequired => ("ANNOT-002", "{0} annotation shall have the Print flag set"),
    /// Hidden/Invisible/NoView/ToggleNoView set
    AnnotationFlagNotAllowed => ("ANNOT-003", "{0} annotation shall not set the {1} flag"),
    /// Appearance dictionary missing
    AnnotationAppearanceMissing => ("ANNOT-004", "{0} annotation shall have an appearance dictionary with a normal appearance"),
    /// AP contains keys other than N
    AppearanceDictionaryOnlyNormal => ("ANNOT-005", "The appearance dictionary of a {0} annotation shall contain only the N key, found {1}"),
    /// N is not a stream
    AppearanceNormalShallBeStream => ("ANNOT-006", "The normal appearance of a {0} annotation shall be a stream"),
    /// Button widget N is not a state dictionary
    ButtonAppearanceNormalShallBeStateDictionary => ("ANNOT-007", "The normal appearance of a button widget shall be a dictionary of appearance states"),
    /// Tagged level annotation without Contents
    AnnotationContentsRequired => ("ANNOT-008", "{0} annotation without a normal appearance shall have a Contents entry"),
    /// CA below one
    AnnotationOpacityNotAllowed => ("ANNOT-009", "{0} annotation CA value shall be 1.0, found {1}"),

    // Forms, optional content and catalog
    /// NeedAppearances true
    NeedAppearancesNotAllowed => ("FORM-001", "The NeedAppearances flag of the interactive form dictionary shall be false"),
    /// XFA key
    XfaNotAllowed => ("FORM-002", "The interactive form dictionary shall not contain an XFA key"),
    /// OCProperties in a profile without optional content
    OptionalContentNotAllowed => ("OC-001", "Optional content is not allowed in this profile"),
    /// Configuration without Name
    OptionalContentConfigNameRequired => ("OC-002", "Every optional content configuration dictionary shall contain a Name entry"),
    /// Duplicate configuration Name
    OptionalContentConfigNameNotUnique => ("OC-003", "Optional content configuration name {0} is not unique"),
    /// OCG absent from every Order
    OptionalContentGroupNotInOrder => ("OC-004", "Optional content group {0} shall be listed in the Order array of some configuration"),
    /// Order references an unknown group
    OptionalContentOrderUnknownGroup => ("OC-005", "Order array references {0}, which is not in the OCGs array"),
    /// AS key in a configuration
    OptionalContentConfigAsKeyNotAllowed => ("OC-006", "Optional content configuration dictionaries shall not contain the AS key"),
    /// AlternatePresentations
    AlternatePresentationsNotAllowed => ("CAT-001", "The document shall not contain an AlternatePresentations entry"),
    /// Requirements
    RequirementsNotAllowed => ("CAT-002", "The document catalog shall not contain a Requirements entry"),
    /// Catalog Version differs from header
    CatalogVersionMismatch => ("CAT-003", "The catalog Version {0} shall match the file header version {1}"),
    /// Header version outside the part's range
    HeaderVersionNotAllowed => ("CAT-004", "File header version {0} is not allowed, expected {1}"),
    /// Info dictionary with keys other than ModDate
    DocumentInfoOnlyModDate => ("CAT-005", "The document information dictionary shall contain only a ModDate entry, found {0}"),
    /// Encrypt in trailer
    EncryptionNotAllowed => ("CAT-006", "The file trailer shall not contain an Encrypt entry"),
    /// ID missing in trailer
    TrailerIdMissing => ("CAT-007", "The file trailer shall contain an ID entry"),
    /// Too many indirect objects
    TooManyIndirectObjects => ("CAT-008", "The number of indirect objects {0} exceeds the maximum of {1}"),

    // Metadata and structure
    /// Metadata stream missing
    MetadataMissing => ("XMP-001", "The document catalog shall contain a Metadata stream"),
    /// pdfaid value mismatch
    XmpIdentificationMismatch => ("XMP-002", "XMP pdfaid:{0} is {1}, expected {2}"),
    /// pdfaid value missing
    XmpIdentificationMissing => ("XMP-003", "XMP metadata shall contain pdfaid:{0}"),
    /// Tagged level without MarkInfo/Marked
    MarkInfoRequired => ("STRUCT-001", "The document catalog shall contain a MarkInfo dictionary with Marked set to true"),
    /// Tagged level without StructTreeRoot
    StructTreeRootRequired => ("STRUCT-002", "The document catalog shall contain a StructTreeRoot"),
    /// Tagged level without Lang
    LanguageRequired => ("STRUCT-003", "The document catalog shall specify the natural language with a Lang entry"),

    // Embedded files
    /// Embedded file in a profile forbidding them
    EmbeddedFilesNotAllowed => ("FILE-001", "Embedded files are not allowed in this profile"),
    /// F or UF missing
    FileSpecNamesRequired => ("FILE-002", "File specification {0} shall contain both F and UF entries"),
    /// AFRelationship missing
    FileSpecRelationshipRequired => ("FILE-003", "File specification {0} shall contain an AFRelationship entry"),
    /// Subtype missing
    EmbeddedFileMimeTypeRequired => ("FILE-004", "Embedded file {0} shall declare its MIME type in the Subtype entry"),
    /// Non-PDF archival payload
    EmbeddedFileShallBePdf => ("FILE-005", "Embedded file {0} shall be a PDF/A file (application/pdf), found {1}"),
    /// Params/ModDate missing
    EmbeddedFileModDateRequired => ("FILE-006", "Embedded file {0} shall contain a Params dictionary with a ModDate entry"),
    /// 4f without embedded files
    EmbeddedFileRequired => ("FILE-007", "This profile requires at least one embedded file"),
}

/// A broken rule, raised as a failure and never aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceViolation {
    rule: RuleId,
    level: PdfALevel,
    params: Vec<String>,
}

impl ConformanceViolation {
    /// Create a violation.
    pub fn new(rule: RuleId, level: PdfALevel, params: Vec<String>) -> Self {
        Self { rule, level, params }
    }

    /// The broken rule.
    pub fn rule(&self) -> RuleId {
        self.rule
    }

    /// Stable code of the broken rule.
    pub fn code(&self) -> &'static str {
        self.rule.code()
    }

    /// The profile that was being enforced.
    pub fn level(&self) -> PdfALevel {
        self.level
    }

    /// Template parameters.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// The template with its placeholders substituted.
    pub fn message(&self) -> String {
        let mut message = self.rule.template().to_string();
        for (i, param) in self.params.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), param);
        }
        message
    }
}

impl fmt::Display for ConformanceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.rule.code(), self.message(), self.level)
    }
}

impl std::error::Error for ConformanceViolation {}

/// Builds and raises violations for one profile.
#[derive(Debug, Clone, Copy)]
pub struct ViolationReporter {
    level: PdfALevel,
}

impl ViolationReporter {
    /// Create a reporter for a profile.
    pub fn new(level: PdfALevel) -> Self {
        Self { level }
    }

    /// The profile violations are reported against.
    pub fn level(&self) -> PdfALevel {
        self.level
    }

    /// Build a violation with parameters.
    pub fn violation<I, S>(&self, rule: RuleId, params: I) -> ConformanceViolation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let violation =
            ConformanceViolation::new(rule, self.level, params.into_iter().map(Into::into).collect());
        log::warn!("{}", violation);
        violation
    }

    /// Raise a violation without parameters.
    pub fn raise<T>(&self, rule: RuleId) -> Result<T> {
        Err(Error::Conformance(self.violation(rule, std::iter::empty::<String>())))
    }

    /// Raise a violation with parameters.
    pub fn raise_with<T, I, S>(&self, rule: RuleId, params: I) -> Result<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Err(Error::Conformance(self.violation(rule, params)))
    }

    /// Raise `rule` unless `condition` holds.
    pub fn ensure(&self, condition: bool, rule: RuleId) -> Result<()> {
        if condition {
            Ok(())
        } else {
            self.raise(rule)
        }
    }

    /// Raise `rule` with parameters unless `condition` holds.
    pub fn ensure_with<I, S>(&self, condition: bool, rule: RuleId, params: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if condition {
            Ok(())
        } else {
            self.raise_with(rule, params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_substitution() {
        let reporter = ViolationReporter::new(PdfALevel::A1b);
        let v = reporter.violation(RuleId::DeviceColorNotPermitted, ["DeviceRGB", "DefaultRGB"]);
        assert_eq!(
            v.message(),
            "DeviceRGB may be used only if the file has a matching PDF/A output intent or a DefaultRGB color space in the usage context"
        );
        assert_eq!(v.code(), "COLOR-001");
        assert_eq!(v.level(), PdfALevel::A1b);
    }

    #[test]
    fn test_display_includes_code_and_profile() {
        let reporter = ViolationReporter::new(PdfALevel::A2b);
        let v = reporter.violation(RuleId::GraphicsStateStackDepthExceeded, ["28"]);
        assert_eq!(
            v.to_string(),
            "[GSTATE-001] Graphics state stack depth is greater than 28 (PDF/A-2b)"
        );
    }

    #[test]
    fn test_raise_returns_conformance_error() {
        let reporter = ViolationReporter::new(PdfALevel::A3b);
        let result: Result<()> = reporter.raise(RuleId::EncryptionNotAllowed);
        let err = result.unwrap_err();
        assert_eq!(err.violation().map(ConformanceViolation::rule), Some(RuleId::EncryptionNotAllowed));
    }

    #[test]
    fn test_ensure() {
        let reporter = ViolationReporter::new(PdfALevel::A4);
        assert!(reporter.ensure(true, RuleId::TrailerIdMissing).is_ok());
        assert!(reporter
            .ensure_with(false, RuleId::ActionNotAllowed, ["Launch"])
            .is_err());
    }

    #[test]
    fn test_codes_are_unique() {
        let rules = [
            RuleId::ActionNotAllowed,
            RuleId::AdditionalActionsKeyNotAllowed,
            RuleId::AnnotationTypeNotAllowed,
            RuleId::FontNotEmbedded,
            RuleId::EmbeddedFileRequired,
            RuleId::GraphicsStateStackDepthExceeded,
        ];
        let codes: std::collections::HashSet<_> = rules.iter().map(RuleId::code).collect();
        assert_eq!(codes.len(), rules.len());
    }
}
