//! Content stream operators.
//!
//! Only operators that some rule looks at get their own variant; everything
//! else is kept as [`ContentOp::Other`] so streams survive a parse/write
//! cycle unchanged in meaning.

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::Object;
use crate::parser::parse_operand;
use crate::writer::ObjectSerializer;

/// A content stream operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set nonstroking color space (cs)
    SetFillColorSpace(String),
    /// Set stroking color space (CS)
    SetStrokeColorSpace(String),
    /// Set nonstroking color (sc, scn); a trailing name selects a pattern
    SetFillColor(Vec<Object>),
    /// Set stroking color (SC, SCN)
    SetStrokeColor(Vec<Object>),
    /// DeviceGray nonstroking color (g)
    SetFillGray(f64),
    /// DeviceGray stroking color (G)
    SetStrokeGray(f64),
    /// DeviceRGB nonstroking color (rg)
    SetFillRgb(f64, f64, f64),
    /// DeviceRGB stroking color (RG)
    SetStrokeRgb(f64, f64, f64),
    /// DeviceCMYK nonstroking color (k)
    SetFillCmyk(f64, f64, f64, f64),
    /// DeviceCMYK stroking color (K)
    SetStrokeCmyk(f64, f64, f64, f64),
    /// Apply a named ExtGState (gs)
    SetExtGState(String),
    /// Set rendering intent (ri)
    SetRenderingIntent(String),
    /// Paint an XObject (Do)
    PaintXObject(String),
    /// Paint a shading (sh)
    PaintShading(String),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font and size (Tf)
    SetFont {
        /// Font resource name
        name: String,
        /// Font size
        size: f64,
    },
    /// Show text (Tj)
    ShowText(Vec<u8>),
    /// Show text with positioning (TJ)
    ShowTextArray(Vec<Object>),
    /// Next line and show text (')
    NextLineShowText(Vec<u8>),
    /// Set spacing, next line and show text (")
    SpacedShowText {
        /// Word spacing
        word_space: f64,
        /// Character spacing
        char_space: f64,
        /// Text bytes
        text: Vec<u8>,
    },
    /// Any other operator, passed through unchecked
    Other {
        /// Operator keyword
        operator: String,
        /// Operands in order
        operands: Vec<Object>,
    },
}

impl ContentOp {
    /// Build an operator from its keyword and operands. Operators with
    /// malformed operands are kept as [`ContentOp::Other`].
    pub fn from_parts(operator: &str, operands: Vec<Object>) -> ContentOp {
        typed_op(operator, &operands).unwrap_or_else(|| ContentOp::Other {
            operator: operator.to_string(),
            operands,
        })
    }

    /// The operator keyword.
    pub fn operator(&self) -> &str {
        match self {
            ContentOp::SaveState => "q",
            ContentOp::RestoreState => "Q",
            ContentOp::SetFillColorSpace(_) => "cs",
            ContentOp::SetStrokeColorSpace(_) => "CS",
            ContentOp::SetFillColor(_) => "scn",
            ContentOp::SetStrokeColor(_) => "SCN",
            ContentOp::SetFillGray(_) => "g",
            ContentOp::SetStrokeGray(_) => "G",
            ContentOp::SetFillRgb(..) => "rg",
            ContentOp::SetStrokeRgb(..) => "RG",
            ContentOp::SetFillCmyk(..) => "k",
            ContentOp::SetStrokeCmyk(..) => "K",
            ContentOp::SetExtGState(_) => "gs",
            ContentOp::SetRenderingIntent(_) => "ri",
            ContentOp::PaintXObject(_) => "Do",
            ContentOp::PaintShading(_) => "sh",
            ContentOp::BeginText => "BT",
            ContentOp::EndText => "ET",
            ContentOp::SetFont { .. } => "Tf",
            ContentOp::ShowText(_) => "Tj",
            ContentOp::ShowTextArray(_) => "TJ",
            ContentOp::NextLineShowText(_) => "'",
            ContentOp::SpacedShowText { .. } => "\"",
            ContentOp::Other { operator, .. } => operator,
        }
    }

    /// The operands in stream order.
    pub fn operands(&self) -> Vec<Object> {
        let reals = |values: &[f64]| values.iter().map(|v| Object::Real(*v)).collect();
        match self {
            ContentOp::SaveState | ContentOp::RestoreState | ContentOp::BeginText | ContentOp::EndText => {
                Vec::new()
            },
            ContentOp::SetFillColorSpace(name)
            | ContentOp::SetStrokeColorSpace(name)
            | ContentOp::SetExtGState(name)
            | ContentOp::SetRenderingIntent(name)
            | ContentOp::PaintXObject(name)
            | ContentOp::PaintShading(name) => vec![Object::name(name.as_str())],
            ContentOp::SetFillColor(operands) | ContentOp::SetStrokeColor(operands) => operands.clone(),
            ContentOp::SetFillGray(g) | ContentOp::SetStrokeGray(g) => vec![Object::Real(*g)],
            ContentOp::SetFillRgb(r, g, b) | ContentOp::SetStrokeRgb(r, g, b) => reals(&[*r, *g, *b]),
            ContentOp::SetFillCmyk(c, m, y, k) | ContentOp::SetStrokeCmyk(c, m, y, k) => {
                reals(&[*c, *m, *y, *k])
            },
            ContentOp::SetFont { name, size } => vec![Object::name(name.as_str()), Object::Real(*size)],
            ContentOp::ShowText(text) | ContentOp::NextLineShowText(text) => vec![Object::String(text.clone())],
            ContentOp::ShowTextArray(items) => vec![Object::Array(items.clone())],
            ContentOp::SpacedShowText {
                word_space,
                char_space,
                text,
            } => vec![
                Object::Real(*word_space),
                Object::Real(*char_space),
                Object::String(text.clone()),
            ],
            ContentOp::Other { operands, .. } => operands.clone(),
        }
    }

    /// Append the operator in content stream syntax, followed by a newline.
    pub fn write(&self, out: &mut Vec<u8>) {
        let serializer = ObjectSerializer::compact();
        for operand in self.operands() {
            serializer.write_object(out, &operand);
            out.push(b' ');
        }
        out.extend_from_slice(self.operator().as_bytes());
        out.push(b'\n');
    }
}

fn typed_op(operator: &str, operands: &[Object]) -> Option<ContentOp> {
    let num = |i: usize| operands.get(i).and_then(Object::as_number);
    let name = |i: usize| operands.get(i).and_then(Object::as_name).map(str::to_string);
    let string = |i: usize| operands.get(i).and_then(Object::as_string).map(<[u8]>::to_vec);

    let op = match operator {
        "q" => ContentOp::SaveState,
        "Q" => ContentOp::RestoreState,
        "cs" => ContentOp::SetFillColorSpace(name(0)?),
        "CS" => ContentOp::SetStrokeColorSpace(name(0)?),
        "sc" | "scn" => ContentOp::SetFillColor(operands.to_vec()),
        "SC" | "SCN" => ContentOp::SetStrokeColor(operands.to_vec()),
        "g" => ContentOp::SetFillGray(num(0)?),
        "G" => ContentOp::SetStrokeGray(num(0)?),
        "rg" => ContentOp::SetFillRgb(num(0)?, num(1)?, num(2)?),
        "RG" => ContentOp::SetStrokeRgb(num(0)?, num(1)?, num(2)?),
        "k" => ContentOp::SetFillCmyk(num(0)?, num(1)?, num(2)?, num(3)?),
        "K" => ContentOp::SetStrokeCmyk(num(0)?, num(1)?, num(2)?, num(3)?),
        "gs" => ContentOp::SetExtGState(name(0)?),
        "ri" => ContentOp::SetRenderingIntent(name(0)?),
        "Do" => ContentOp::PaintXObject(name(0)?),
        "sh" => ContentOp::PaintShading(name(0)?),
        "BT" => ContentOp::BeginText,
        "ET" => ContentOp::EndText,
        "Tf" => ContentOp::SetFont {
            name: name(0)?,
            size: num(1)?,
        },
        "Tj" => ContentOp::ShowText(string(0)?),
        "TJ" => ContentOp::ShowTextArray(operands.first()?.as_array()?.clone()),
        "'" => ContentOp::NextLineShowText(string(0)?),
        "\"" => ContentOp::SpacedShowText {
            word_space: num(0)?,
            char_space: num(1)?,
            text: string(2)?,
        },
        _ => return None,
    };
    Some(op)
}

/// Serialize a sequence of operators.
pub fn write_content(ops: &[ContentOp]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        op.write(&mut out);
    }
    out
}

/// Parse decoded content stream bytes into operators.
///
/// Inline images (BI ... ID ... EI) are kept as a single `BI` operator
/// without operands; their data is skipped.
pub fn parse_content(data: &[u8]) -> Result<Vec<ContentOp>> {
    let mut ops = Vec::new();
    let mut operands = Vec::new();
    let mut input = skip_ws(data);

    while !input.is_empty() {
        let offset = data.len() - input.len();
        match token(input) {
            Ok((rest, Token::Keyword("BI"))) => {
                operands.clear();
                input = skip_inline_image(rest);
                ops.push(ContentOp::Other {
                    operator: "BI".to_string(),
                    operands: Vec::new(),
                });
            },
            Ok((rest, Token::Keyword(keyword))) => {
                ops.push(ContentOp::from_parts(keyword, std::mem::take(&mut operands)));
                input = rest;
            },
            _ => match parse_operand(input) {
                Ok((rest, operand)) => {
                    operands.push(operand);
                    input = rest;
                },
                Err(_) => {
                    return Err(Error::ParseError {
                        offset,
                        reason: "invalid content stream token".to_string(),
                    })
                },
            },
        }
        input = skip_ws(input);
    }

    if !operands.is_empty() {
        log::debug!("Content stream ends with {} dangling operands", operands.len());
    }
    Ok(ops)
}

/// Skip past the EI that ends an inline image.
fn skip_inline_image(input: &[u8]) -> &[u8] {
    let is_ws = |b: u8| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C);
    let mut pos = 0;
    while pos + 2 <= input.len() {
        if &input[pos..pos + 2] == b"EI"
            && (pos == 0 || is_ws(input[pos - 1]))
            && input.get(pos + 2).map_or(true, |b| is_ws(*b))
        {
            return &input[pos + 2..];
        }
        pos += 1;
    }
    &input[input.len()..]
}
