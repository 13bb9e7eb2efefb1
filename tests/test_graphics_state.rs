//! Graphics state nesting through the authoring canvas.

use pdfa_conformance::{DocumentConfig, Error, PdfALevel, PdfDocument, ProfileDescriptor, RuleId};
use proptest::prelude::*;

fn document_with_depth(max_depth: usize) -> PdfDocument {
    let mut descriptor = ProfileDescriptor::for_level(PdfALevel::A2b);
    descriptor.max_graphics_state_depth = max_depth;
    PdfDocument::with_descriptor(descriptor, DocumentConfig::default()).unwrap()
}

#[test]
fn test_default_limit_is_28() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = PdfDocument::new(PdfALevel::A1b).unwrap();
    let page = doc.add_page(100.0, 100.0).unwrap();
    let mut canvas = doc.canvas(page).unwrap();
    for _ in 0..28 {
        canvas.save_state().unwrap();
    }
    assert_eq!(canvas.depth(), 28);

    let err = canvas.save_state().unwrap_err();
    let violation = err.violation().unwrap();
    assert_eq!(violation.rule(), RuleId::GraphicsStateStackDepthExceeded);
    assert_eq!(violation.params(), ["28".to_string()]);
    drop(canvas);
    assert!(doc.is_failed());
}

#[test]
fn test_restore_without_save() {
    let mut doc = PdfDocument::new(PdfALevel::A3b).unwrap();
    let page = doc.add_page(100.0, 100.0).unwrap();
    let mut canvas = doc.canvas(page).unwrap();
    let result = canvas.save_state().and_then(|c| c.restore_state()).and_then(|c| c.restore_state());
    assert_eq!(
        result.err().and_then(|e| e.violation().map(|v| v.rule())),
        Some(RuleId::UnbalancedRestoreState)
    );
}

#[test]
fn test_open_saves_closed_on_finish() {
    let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
    let page = doc.add_page(100.0, 100.0).unwrap();
    let mut canvas = doc.canvas(page).unwrap();
    canvas.save_state().unwrap().save_state().unwrap();
    assert_eq!(canvas.ops().len(), 2);
    canvas.finish().unwrap();
    assert!(doc.close().is_ok());
}

#[test]
fn test_canvas_on_unknown_page() {
    let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
    assert!(matches!(doc.canvas(3), Err(Error::UnknownPage(3))));
    assert!(!doc.is_failed());
}

proptest! {
    #[test]
    fn prop_saves_up_to_limit_succeed(max_depth in 1usize..40, extra in 1usize..4) {
        let mut doc = document_with_depth(max_depth);
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        for _ in 0..max_depth {
            prop_assert!(canvas.save_state().is_ok());
        }
        prop_assert_eq!(canvas.depth(), max_depth);

        let err = canvas.save_state().unwrap_err();
        prop_assert_eq!(err.violation().map(|v| v.rule()), Some(RuleId::GraphicsStateStackDepthExceeded));
        // The failed save leaves the stack alone
        prop_assert_eq!(canvas.depth(), max_depth);
        for _ in 0..extra {
            prop_assert!(matches!(canvas.save_state(), Err(Error::DocumentFailed)));
        }
    }

    #[test]
    fn prop_balanced_nesting_closes(depths in proptest::collection::vec(0usize..10, 1..8)) {
        let mut doc = document_with_depth(28);
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        for depth in depths {
            for _ in 0..depth {
                canvas.save_state().unwrap();
            }
            for _ in 0..depth {
                canvas.restore_state().unwrap();
            }
            prop_assert_eq!(canvas.depth(), 0);
        }
        canvas.finish().unwrap();
        prop_assert!(doc.close().is_ok());
    }
}
