//! Font checks.

use super::StructureChecker;
use crate::compliance::violation::RuleId;
use crate::error::Result;
use crate::object::{dict_name, Dictionary, Object};

const FONT_FILE_KEYS: &[&str] = &["FontFile", "FontFile2", "FontFile3"];

/// Symbolic flag in FontDescriptor /Flags (bit 3).
const FLAG_SYMBOLIC: i64 = 1 << 2;

/// Whether a BaseFont name carries a subset tag such as `ABCDEF+`.
fn is_subset_name(base_font: &str) -> bool {
    let bytes = base_font.as_bytes();
    bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(u8::is_ascii_uppercase)
}

impl StructureChecker<'_> {
    /// Check a font dictionary. `name` is the resource name used in
    /// diagnostics.
    pub fn check_font(&self, name: &str, font: &Dictionary) -> Result<()> {
        let rules = self.descriptor.font_rules();
        let subtype = dict_name(font, "Subtype").unwrap_or_default();

        if rules.require_to_unicode {
            self.reporter.ensure_with(
                self.store.entry(font, "ToUnicode").is_some(),
                RuleId::FontMissingToUnicode,
                [name],
            )?;
        }

        match subtype {
            // Glyphs are content streams in the font itself
            "Type3" => Ok(()),
            "Type0" => {
                let descendant = self
                    .store
                    .entry_array(font, "DescendantFonts")
                    .and_then(|fonts| fonts.first())
                    .and_then(|f| self.store.resolve_dict(f));
                match descendant {
                    Some(cid_font) => self.check_font_program(name, cid_font, true),
                    None => self.reporter.raise_with(RuleId::FontNotEmbedded, [name]),
                }
            },
            _ => {
                self.check_font_program(name, font, false)?;
                if subtype == "TrueType" {
                    self.check_truetype_encoding(name, font)?;
                }
                Ok(())
            },
        }
    }

    fn check_font_program(&self, name: &str, font: &Dictionary, cid: bool) -> Result<()> {
        let rules = self.descriptor.font_rules();
        let descriptor = self.store.entry_dict(font, "FontDescriptor");

        if rules.require_embedding {
            let embedded = descriptor
                .map(|d| FONT_FILE_KEYS.iter().any(|key| self.store.entry(d, key).is_some()))
                .unwrap_or(false);
            self.reporter
                .ensure_with(embedded, RuleId::FontNotEmbedded, [name])?;
        }

        let subset = dict_name(font, "BaseFont").is_some_and(is_subset_name);
        let (Some(descriptor), true) = (descriptor, subset) else {
            return Ok(());
        };
        if cid && rules.require_cid_set_for_subsets {
            self.reporter.ensure_with(
                self.store.entry(descriptor, "CIDSet").is_some_and(Object::is_stream),
                RuleId::SubsetCidFontMissingCidSet,
                [name],
            )?;
        }
        if !cid && dict_name(font, "Subtype") == Some("Type1") && rules.require_char_set_for_subsets {
            self.reporter.ensure_with(
                self.store.entry(descriptor, "CharSet").is_some(),
                RuleId::SubsetType1MissingCharSet,
                [name],
            )?;
        }
        Ok(())
    }

    fn check_truetype_encoding(&self, name: &str, font: &Dictionary) -> Result<()> {
        let rules = self.descriptor.font_rules();
        let flags = self
            .store
            .entry_dict(font, "FontDescriptor")
            .and_then(|d| self.store.entry(d, "Flags"))
            .and_then(Object::as_integer)
            .unwrap_or(0);

        let encoding = self.store.entry(font, "Encoding");
        if flags & FLAG_SYMBOLIC != 0 {
            if rules.forbid_symbolic_truetype_encoding {
                self.reporter
                    .ensure_with(encoding.is_none(), RuleId::SymbolicTrueTypeEncoding, [name])?;
            }
            return Ok(());
        }

        let base = match encoding {
            Some(Object::Name(base)) => Some(base.as_str()),
            Some(Object::Dictionary(dict)) => self.store.entry(dict, "BaseEncoding").and_then(Object::as_name),
            _ => None,
        };
        self.reporter.ensure_with(
            base.is_some_and(|b| rules.non_symbolic_encoding_allowed(b)),
            RuleId::NonSymbolicTrueTypeEncoding,
            [name],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::compliance::types::PdfALevel;
    use crate::store::ObjectStore;

    fn rule_of(result: Result<()>) -> Option<RuleId> {
        result.err().and_then(|e| e.violation().map(|v| v.rule()))
    }

    fn dict(entries: Vec<(&str, Object)>) -> Dictionary {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn embedded_descriptor(store: &mut ObjectStore, flags: i64) -> Object {
        let program = store.insert(Object::stream(Dictionary::new(), b"font program".to_vec()));
        Object::Reference(store.insert(Object::Dictionary(dict(vec![
            ("Type", Object::name("FontDescriptor")),
            ("Flags", Object::Integer(flags)),
            ("FontFile2", Object::Reference(program)),
        ]))))
    }

    #[test]
    fn test_subset_tag() {
        assert!(is_subset_name("ABCDEF+Helvetica"));
        assert!(!is_subset_name("Helvetica"));
        assert!(!is_subset_name("abcdef+Helvetica"));
    }

    #[test]
    fn test_unembedded_font() {
        let (store, _) = minimal_store();
        let d = descriptor(PdfALevel::A2b);
        let font = dict(vec![("Subtype", Object::name("Type1")), ("BaseFont", Object::name("Helvetica"))]);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_font("F1", &font)),
            Some(RuleId::FontNotEmbedded)
        );
    }

    #[test]
    fn test_type3_needs_no_program() {
        let (store, _) = minimal_store();
        let d = descriptor(PdfALevel::A2b);
        let font = dict(vec![("Subtype", Object::name("Type3"))]);
        assert!(StructureChecker::new(&d, &store).check_font("T3", &font).is_ok());
    }

    #[test]
    fn test_to_unicode_for_unicode_levels() {
        let (mut store, _) = minimal_store();
        let fd = embedded_descriptor(&mut store, 32);
        let font = dict(vec![
            ("Subtype", Object::name("TrueType")),
            ("BaseFont", Object::name("Arial")),
            ("Encoding", Object::name("WinAnsiEncoding")),
            ("FontDescriptor", fd),
        ]);
        let b = descriptor(PdfALevel::A2b);
        let u = descriptor(PdfALevel::A2u);
        assert!(StructureChecker::new(&b, &store).check_font("F1", &font).is_ok());
        assert_eq!(
            rule_of(StructureChecker::new(&u, &store).check_font("F1", &font)),
            Some(RuleId::FontMissingToUnicode)
        );
    }

    #[test]
    fn test_truetype_encodings() {
        let (mut store, _) = minimal_store();
        let nonsymbolic = embedded_descriptor(&mut store, 32);
        let symbolic = embedded_descriptor(&mut store, 4);
        let d = descriptor(PdfALevel::A1b);

        let standard = dict(vec![
            ("Subtype", Object::name("TrueType")),
            ("Encoding", Object::name("StandardEncoding")),
            ("FontDescriptor", nonsymbolic),
        ]);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_font("F1", &standard)),
            Some(RuleId::NonSymbolicTrueTypeEncoding)
        );

        let with_encoding = dict(vec![
            ("Subtype", Object::name("TrueType")),
            ("Encoding", Object::name("WinAnsiEncoding")),
            ("FontDescriptor", symbolic),
        ]);
        assert_eq!(
            rule_of(StructureChecker::new(&d, &store).check_font("F2", &with_encoding)),
            Some(RuleId::SymbolicTrueTypeEncoding)
        );
        let d2 = descriptor(PdfALevel::A2b);
        assert!(StructureChecker::new(&d2, &store).check_font("F2", &with_encoding).is_ok());
    }

    #[test]
    fn test_part1_subset_cid_font_needs_cid_set() {
        let (mut store, _) = minimal_store();
        let fd = embedded_descriptor(&mut store, 4);
        let cid_font = store.insert(Object::Dictionary(dict(vec![
            ("Subtype", Object::name("CIDFontType2")),
            ("BaseFont", Object::name("ABCDEF+NotoSans")),
            ("FontDescriptor", fd),
        ])));
        let font = dict(vec![
            ("Subtype", Object::name("Type0")),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font)])),
            ("ToUnicode", Object::name("Identity-H")),
        ]);
        let d1 = descriptor(PdfALevel::A1b);
        let d2 = descriptor(PdfALevel::A2b);
        assert_eq!(
            rule_of(StructureChecker::new(&d1, &store).check_font("F0", &font)),
            Some(RuleId::SubsetCidFontMissingCidSet)
        );
        assert!(StructureChecker::new(&d2, &store).check_font("F0", &font).is_ok());
    }
}
