//! Checked drawing surface for one page.

use super::graphics_state::GraphicsStateTracker;
use super::operators::ContentOp;
use crate::document::PdfDocument;
use crate::error::Result;
use crate::object::{Object, ObjectRef};

/// Draws content on a page, checking every operator as it is emitted.
///
/// The canvas owns the graphics state of its content stream; nothing
/// carries over between canvases. An operator that breaks a rule is not
/// recorded and the document is failed. Call [`Canvas::finish`] to store
/// the content; a canvas dropped without it discards what was drawn.
#[derive(Debug)]
pub struct Canvas<'d> {
    document: &'d mut PdfDocument,
    page: usize,
    tracker: GraphicsStateTracker,
    ops: Vec<ContentOp>,
}

impl<'d> Canvas<'d> {
    pub(crate) fn new(document: &'d mut PdfDocument, page: usize) -> Self {
        let tracker = GraphicsStateTracker::new(document.descriptor());
        Self {
            document,
            page,
            tracker,
            ops: Vec::new(),
        }
    }

    /// Page index this canvas draws on.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Current q nesting depth.
    pub fn depth(&self) -> usize {
        self.tracker.depth()
    }

    /// Graphics state of the stream so far.
    pub fn state(&self) -> &GraphicsStateTracker {
        &self.tracker
    }

    /// Operators recorded so far.
    pub fn ops(&self) -> &[ContentOp] {
        &self.ops
    }

    /// Check and record any operator.
    pub fn op(&mut self, op: ContentOp) -> Result<&mut Self> {
        self.document.check_content_op(self.page, &mut self.tracker, &op)?;
        self.ops.push(op);
        Ok(self)
    }

    /// q
    pub fn save_state(&mut self) -> Result<&mut Self> {
        self.op(ContentOp::SaveState)
    }

    /// Q
    pub fn restore_state(&mut self) -> Result<&mut Self> {
        self.op(ContentOp::RestoreState)
    }

    /// cs with a color space resource or device space name.
    pub fn set_fill_color_space(&mut self, name: &str) -> Result<&mut Self> {
        self.op(ContentOp::SetFillColorSpace(name.to_string()))
    }

    /// CS with a color space resource or device space name.
    pub fn set_stroke_color_space(&mut self, name: &str) -> Result<&mut Self> {
        self.op(ContentOp::SetStrokeColorSpace(name.to_string()))
    }

    /// scn with components in the current fill space.
    pub fn set_fill_color(&mut self, components: &[f64]) -> Result<&mut Self> {
        self.op(ContentOp::SetFillColor(components.iter().map(|c| Object::Real(*c)).collect()))
    }

    /// scn selecting a pattern resource.
    pub fn set_fill_pattern(&mut self, pattern: &str) -> Result<&mut Self> {
        self.op(ContentOp::SetFillColor(vec![Object::name(pattern)]))
    }

    /// SCN with components in the current stroke space.
    pub fn set_stroke_color(&mut self, components: &[f64]) -> Result<&mut Self> {
        self.op(ContentOp::SetStrokeColor(components.iter().map(|c| Object::Real(*c)).collect()))
    }

    /// g
    pub fn set_fill_gray(&mut self, gray: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetFillGray(gray))
    }

    /// G
    pub fn set_stroke_gray(&mut self, gray: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetStrokeGray(gray))
    }

    /// rg
    pub fn set_fill_rgb(&mut self, r: f64, g: f64, b: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetFillRgb(r, g, b))
    }

    /// RG
    pub fn set_stroke_rgb(&mut self, r: f64, g: f64, b: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetStrokeRgb(r, g, b))
    }

    /// k
    pub fn set_fill_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetFillCmyk(c, m, y, k))
    }

    /// K
    pub fn set_stroke_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetStrokeCmyk(c, m, y, k))
    }

    /// gs
    pub fn set_ext_gstate(&mut self, name: &str) -> Result<&mut Self> {
        self.op(ContentOp::SetExtGState(name.to_string()))
    }

    /// ri
    pub fn set_rendering_intent(&mut self, intent: &str) -> Result<&mut Self> {
        self.op(ContentOp::SetRenderingIntent(intent.to_string()))
    }

    /// Do
    pub fn draw_xobject(&mut self, name: &str) -> Result<&mut Self> {
        self.op(ContentOp::PaintXObject(name.to_string()))
    }

    /// sh
    pub fn paint_shading(&mut self, name: &str) -> Result<&mut Self> {
        self.op(ContentOp::PaintShading(name.to_string()))
    }

    /// BT
    pub fn begin_text(&mut self) -> Result<&mut Self> {
        self.op(ContentOp::BeginText)
    }

    /// ET
    pub fn end_text(&mut self) -> Result<&mut Self> {
        self.op(ContentOp::EndText)
    }

    /// Tf
    pub fn set_font(&mut self, name: &str, size: f64) -> Result<&mut Self> {
        self.op(ContentOp::SetFont {
            name: name.to_string(),
            size,
        })
    }

    /// Td
    pub fn move_text(&mut self, tx: f64, ty: f64) -> Result<&mut Self> {
        self.other("Td", &[tx, ty])
    }

    /// Tj
    pub fn show_text(&mut self, text: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.op(ContentOp::ShowText(text.into()))
    }

    /// cm
    pub fn transform(&mut self, matrix: [f64; 6]) -> Result<&mut Self> {
        self.other("cm", &matrix)
    }

    /// re
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<&mut Self> {
        self.other("re", &[x, y, width, height])
    }

    /// m
    pub fn move_to(&mut self, x: f64, y: f64) -> Result<&mut Self> {
        self.other("m", &[x, y])
    }

    /// l
    pub fn line_to(&mut self, x: f64, y: f64) -> Result<&mut Self> {
        self.other("l", &[x, y])
    }

    /// f
    pub fn fill(&mut self) -> Result<&mut Self> {
        self.other("f", &[])
    }

    /// S
    pub fn stroke(&mut self) -> Result<&mut Self> {
        self.other("S", &[])
    }

    fn other(&mut self, operator: &str, operands: &[f64]) -> Result<&mut Self> {
        self.op(ContentOp::Other {
            operator: operator.to_string(),
            operands: operands.iter().map(|v| Object::Real(*v)).collect(),
        })
    }

    /// Close any open q, store the content stream and attach it to the
    /// page. Returns the stream reference.
    pub fn finish(mut self) -> Result<ObjectRef> {
        while self.tracker.depth() > 0 {
            self.restore_state()?;
        }
        let uses_transparency = self.tracker.uses_transparency();
        let reference = self
            .document
            .finish_page_content(self.page, &self.ops, uses_transparency)?;
        log::debug!(
            "Released canvas for page {} (transparency: {})",
            self.page + 1,
            uses_transparency
        );
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::icc::synthetic_profile;
    use crate::color::{IccProfile, OutputIntent};
    use crate::compliance::types::PdfALevel;
    use crate::compliance::violation::RuleId;
    use crate::error::Error;
    use crate::object::Dictionary;

    fn rule_of<T>(result: Result<T>) -> Option<RuleId> {
        result.err().and_then(|e| e.violation().map(|v| v.rule()))
    }

    fn rgb_document(level: PdfALevel) -> PdfDocument {
        let mut doc = PdfDocument::new(level).unwrap();
        let profile = IccProfile::new(synthetic_profile(b"RGB ", b"mntr", 2), 3);
        doc.add_output_intent(OutputIntent::pdfa("sRGB", profile)).unwrap();
        doc
    }

    #[test]
    fn test_finish_balances_open_saves() {
        let mut doc = rgb_document(PdfALevel::A2b);
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        canvas.save_state().unwrap();
        canvas.save_state().unwrap();
        canvas.set_fill_rgb(1.0, 0.0, 0.0).unwrap();
        assert_eq!(canvas.depth(), 2);
        assert_eq!(canvas.ops().len(), 3);
        canvas.finish().unwrap();
        assert!(doc.close().is_ok());
    }

    #[test]
    fn test_unbalanced_restore_fails_document() {
        let mut doc = rgb_document(PdfALevel::A2b);
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        assert_eq!(rule_of(canvas.restore_state()), Some(RuleId::UnbalancedRestoreState));
        assert!(matches!(canvas.save_state(), Err(Error::DocumentFailed)));
    }

    #[test]
    fn test_cmyk_without_matching_intent() {
        let mut doc = rgb_document(PdfALevel::A1b);
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        assert!(canvas.set_fill_rgb(0.0, 0.0, 1.0).is_ok());
        assert_eq!(
            rule_of(canvas.set_fill_cmyk(0.0, 0.0, 0.0, 1.0)),
            Some(RuleId::DeviceColorNotPermitted)
        );
    }

    #[test]
    fn test_transparency_recorded_on_page() {
        let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
        let page = doc.add_page(100.0, 100.0).unwrap();
        let gs: Dictionary = [("ca".to_string(), Object::Real(0.5))].into_iter().collect();
        doc.add_ext_gstate(page, "GS1", gs).unwrap();

        let mut canvas = doc.canvas(page).unwrap();
        canvas.set_ext_gstate("GS1").unwrap();
        assert!(canvas.state().uses_transparency());
        canvas.finish().unwrap();

        // No output intent and no page group
        assert_eq!(rule_of(doc.close()), Some(RuleId::PageTransparencyGroupRequired));
    }

    #[test]
    fn test_missing_resource_is_not_a_violation() {
        let mut doc = PdfDocument::new(PdfALevel::A2b).unwrap();
        let page = doc.add_page(100.0, 100.0).unwrap();
        let mut canvas = doc.canvas(page).unwrap();
        assert!(matches!(canvas.draw_xobject("Im9"), Err(Error::MissingResource { .. })));
        assert!(canvas.save_state().is_ok());
    }
}
