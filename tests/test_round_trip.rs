//! Files produced without a violation validate cleanly when read back
//! under the same profile.

use pdfa_conformance::color::icc::synthetic_profile;
use pdfa_conformance::compliance::detect_level;
use pdfa_conformance::{
    Dictionary, EmbeddedFile, IccProfile, Object, OutputIntent, PdfALevel, PdfAValidator, PdfDocument,
    ValidatorOptions,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cmyk_intent() -> OutputIntent {
    let profile = IccProfile::from_bytes(synthetic_profile(b"CMYK", b"prtr", 2)).unwrap();
    OutputIntent::pdfa("FOGRA39", profile).with_info("Coated FOGRA39")
}

/// A document carrying what every level asks for.
fn conforming_document(level: PdfALevel) -> PdfDocument {
    let mut doc = PdfDocument::new(level).unwrap();
    doc.add_output_intent(cmyk_intent()).unwrap();
    let page = doc.add_page(595.0, 842.0).unwrap();

    if level.requires_structure() {
        let root = doc
            .add_object(Object::dict([("Type", Object::name("StructTreeRoot"))]))
            .unwrap();
        doc.set_catalog_entry("MarkInfo", Object::dict([("Marked", Object::Boolean(true))]))
            .unwrap();
        doc.set_catalog_entry("StructTreeRoot", Object::Reference(root)).unwrap();
        doc.set_catalog_entry("Lang", Object::string("en")).unwrap();
    }
    if level == PdfALevel::A4f {
        let file = EmbeddedFile::new("data.json", &b"{}"[..])
            .with_mime_type("application/json")
            .with_relationship("Data")
            .with_mod_date_now();
        doc.embed_file(file).unwrap();
    }

    let gs: Dictionary = [
        ("Type".to_string(), Object::name("ExtGState")),
        ("LW".to_string(), Object::Real(0.5)),
    ]
    .into_iter()
    .collect();
    doc.add_ext_gstate(page, "GS0", gs).unwrap();

    let form_dict: Dictionary = [
        ("Type".to_string(), Object::name("XObject")),
        ("Subtype".to_string(), Object::name("Form")),
        ("BBox".to_string(), Object::numbers(&[0.0, 0.0, 50.0, 50.0])),
    ]
    .into_iter()
    .collect();
    let form = Object::stream(form_dict, b"q 0.5 g 0 0 50 50 re f Q".to_vec());
    doc.add_xobject(page, "Fm0", form).unwrap();

    let mut canvas = doc.canvas(page).unwrap();
    canvas
        .save_state()
        .unwrap()
        .set_ext_gstate("GS0")
        .unwrap()
        .set_stroke_cmyk(1.0, 0.0, 0.0, 0.0)
        .unwrap()
        .move_to(10.0, 10.0)
        .unwrap()
        .line_to(200.0, 200.0)
        .unwrap()
        .stroke()
        .unwrap()
        .draw_xobject("Fm0")
        .unwrap()
        .restore_state()
        .unwrap();
    canvas.finish().unwrap();
    doc
}

#[test]
fn test_every_level_round_trips() {
    init();
    for level in PdfALevel::ALL {
        let mut doc = conforming_document(level);
        let bytes = doc.close().unwrap_or_else(|e| panic!("{}: {}", level, e));
        assert!(doc.is_closed());

        let result = PdfAValidator::new(level).validate_bytes(&bytes);
        assert!(result.is_ok(), "{}: {:?}", level, result);
        assert_eq!(detect_level(&bytes).unwrap(), Some(level));
    }
}

#[test]
fn test_uncompressed_content_round_trips() {
    let config = pdfa_conformance::DocumentConfig::new(PdfALevel::A3b).with_compress(false);
    let mut doc = PdfDocument::with_config(config).unwrap();
    doc.add_output_intent(cmyk_intent()).unwrap();
    let page = doc.add_page(100.0, 100.0).unwrap();
    let mut canvas = doc.canvas(page).unwrap();
    canvas.set_fill_cmyk(0.0, 0.0, 0.0, 1.0).unwrap().rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
    canvas.fill().unwrap();
    canvas.finish().unwrap();

    let bytes = doc.close().unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains(" k\n"));
    assert!(PdfAValidator::new(PdfALevel::A3b).validate_bytes(&bytes).is_ok());
}

#[test]
fn test_validation_is_repeatable() {
    let mut doc = conforming_document(PdfALevel::A2b);
    let bytes = doc.close().unwrap();
    let validator = PdfAValidator::new(PdfALevel::A2b);
    assert!(validator.validate_bytes(&bytes).is_ok());
    assert!(validator.validate_bytes(&bytes).is_ok());

    let structural_only = validator.with_options(ValidatorOptions::new().with_replay_content(false));
    assert!(structural_only.validate_bytes(&bytes).is_ok());
}

#[test]
fn test_other_level_rejects_file() {
    let mut doc = conforming_document(PdfALevel::A3b);
    let bytes = doc.close().unwrap();
    let err = PdfAValidator::new(PdfALevel::A2b).validate_bytes(&bytes).unwrap_err();
    assert!(err.is_conformance());
}

#[test]
fn test_non_pdf_input() {
    assert!(matches!(
        PdfAValidator::new(PdfALevel::A2b).validate_bytes(b"not a pdf"),
        Err(pdfa_conformance::Error::InvalidHeader(_))
    ));
}

mod changed_after_check {
    use super::*;
    use pdfa_conformance::RuleId;

    fn drawn_ext_gstate(doc: &mut PdfDocument) -> pdfa_conformance::ObjectRef {
        let page = doc.add_page(100.0, 100.0).unwrap();
        let gs: Dictionary = [("LW".to_string(), Object::Real(1.0))].into_iter().collect();
        let gs = doc.add_ext_gstate(page, "GS0", gs).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        canvas.set_ext_gstate("GS0").unwrap();
        canvas.finish().unwrap();
        gs
    }

    #[test]
    fn test_changed_ext_gstate_never_written() {
        init();
        let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
        doc.add_output_intent(cmyk_intent()).unwrap();
        let gs = drawn_ext_gstate(&mut doc);
        if let Some(dict) = doc.object_mut(gs).unwrap().as_dict_mut() {
            dict.insert("TR".to_string(), Object::name("Identity"));
        }

        let err = doc.close().unwrap_err();
        assert_eq!(err.violation().map(|v| v.code()), Some("XGS-003"));
        assert!(doc.is_failed());
    }

    #[test]
    fn test_changed_content_stream_replayed() {
        let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
        doc.add_output_intent(cmyk_intent()).unwrap();
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        canvas.set_fill_cmyk(0.0, 0.0, 0.0, 1.0).unwrap();
        let stream = canvas.finish().unwrap();

        *doc.object_mut(stream).unwrap() = Object::stream(Dictionary::new(), b"1 0 0 rg 0 0 5 5 re f".to_vec());
        assert_eq!(
            doc.close().unwrap_err().violation().map(|v| v.rule()),
            Some(RuleId::DeviceColorNotPermitted)
        );
    }

    #[test]
    fn test_raw_javascript_action_never_written() {
        let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
        doc.add_output_intent(cmyk_intent()).unwrap();
        drawn_ext_gstate(&mut doc);
        doc.add_object(Object::dict([("Type", Object::name("Action")), ("S", Object::name("JavaScript"))]))
            .unwrap();
        assert_eq!(
            doc.close().unwrap_err().violation().map(|v| v.rule()),
            Some(RuleId::ActionNotAllowed)
        );
    }
}
