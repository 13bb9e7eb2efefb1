//! PDF object parser.
//!
//! Recursive descent over lexer tokens: primitives, arrays, dictionaries,
//! references and streams. Used by the file reader and, through
//! [`parse_operand`], by the content-stream replay.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use nom::IResult;

/// Decode escape sequences in PDF literal strings.
///
/// ```
/// # use pdfa_conformance::parser::decode_literal_string_escapes;
/// let decoded = decode_literal_string_escapes(b"Section \\247 (a\\)");
/// assert_eq!(decoded, b"Section \xa7 (a)");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            result.push(raw[i]);
            i += 1;
            continue;
        }
        match raw[i + 1] {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(8),
            b'f' => result.push(12),
            b'(' | b')' | b'\\' => result.push(raw[i + 1]),
            b'\n' => {},
            b'\r' => {
                if raw.get(i + 2) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let digits = raw[i + 1..]
                    .iter()
                    .take(3)
                    .take_while(|d| (b'0'..=b'7').contains(*d))
                    .count();
                let value = raw[i + 1..i + 1 + digits]
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + (d - b'0') as u32);
                result.push((value & 0xFF) as u8);
                i += 1 + digits;
                continue;
            },
            // Unknown escape: the backslash is dropped
            other => result.push(other),
        }
        i += 2;
    }

    result
}

/// Decode a hex string body (whitespace ignored, odd digit count padded).
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes.iter().copied().filter(|c| !c.is_ascii_whitespace()).collect();
    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = match pair.get(1) {
                Some(c) => hex_value(*c)?,
                None => 0,
            };
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_value(c: u8) -> Result<u8> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| Error::Decode(format!("invalid hex digit {:?}", c as char)))
}

fn parse_failure(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
}

/// Parse a PDF object from input bytes.
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_value(input, true)
}

/// Parse a content-stream operand. References are not legal in content
/// streams, so "1 0 R" style lookahead is disabled.
pub fn parse_operand(input: &[u8]) -> IResult<&[u8], Object> {
    parse_value(input, false)
}

fn parse_value(input: &[u8], allow_references: bool) -> IResult<&[u8], Object> {
    let (input, tok) = token(input)?;
    object_from_token(input, tok, allow_references)
}

fn object_from_token<'a>(
    input: &'a [u8],
    tok: Token<'a>,
    allow_references: bool,
) -> IResult<&'a [u8], Object> {
    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),
        Token::Integer(i) => {
            if allow_references {
                if let Ok((input2, Token::Integer(gen))) = token(input) {
                    if let Ok((input3, Token::R)) = token(input2) {
                        return Ok((input3, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                }
            }
            Ok((input, Object::Integer(i)))
        },
        Token::Real(r) => Ok((input, Object::Real(r))),
        Token::LiteralString(bytes) => Ok((input, Object::String(decode_literal_string_escapes(bytes)))),
        Token::HexString(hex) => match decode_hex(hex) {
            Ok(decoded) => Ok((input, Object::String(decoded))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Fail))),
        },
        Token::Name(name) => Ok((input, Object::Name(name))),
        Token::ArrayStart => parse_array(input, allow_references),
        Token::DictStart => {
            let (remaining, dict) = parse_dictionary(input, allow_references)?;
            if allow_references {
                if let Ok((stream_input, Token::StreamStart)) = token(remaining) {
                    let (rest, data) = parse_stream_data(stream_input, &dict)?;
                    return Ok((rest, Object::stream(dict, data)));
                }
            }
            Ok((remaining, Object::Dictionary(dict)))
        },
        _ => Err(parse_failure(input)),
    }
}

/// Stream data follows "stream" plus CRLF or LF and runs for /Length bytes.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let input = input
        .strip_prefix(b"\r\n")
        .or_else(|| input.strip_prefix(b"\n"))
        .unwrap_or(input);

    if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
        let length = length as usize;
        if input.len() >= length {
            if let Ok((rest, Token::StreamEnd)) = token(&input[length..]) {
                return Ok((rest, input[..length].to_vec()));
            }
        }
        log::warn!("Stream /Length {} does not reach endstream, scanning for the keyword", length);
    }

    let keyword = b"endstream";
    let pos = input
        .windows(keyword.len())
        .position(|w| w == keyword)
        .ok_or_else(|| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)))?;
    let mut data = &input[..pos];
    if let Some(stripped) = data.strip_suffix(b"\n") {
        data = stripped.strip_suffix(b"\r").unwrap_or(stripped);
    }
    Ok((&input[pos + keyword.len()..], data.to_vec()))
}

fn parse_array(mut input: &[u8], allow_references: bool) -> IResult<&[u8], Object> {
    let mut objects = Vec::new();
    loop {
        let (rest, tok) = token(input)?;
        if tok == Token::ArrayEnd {
            return Ok((rest, Object::Array(objects)));
        }
        let (rest, obj) = object_from_token(rest, tok, allow_references)?;
        objects.push(obj);
        input = rest;
    }
}

fn parse_dictionary(mut input: &[u8], allow_references: bool) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let (rest, tok) = token(input)?;
        let key = match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => key,
            _ => return Err(parse_failure(input)),
        };
        let (rest, value) = parse_value(rest, allow_references)?;
        dict.insert(key, value);
        input = rest;
    }
}

/// Parse "N G obj ... endobj" starting at `input`.
///
/// Returns the reference, the object and the unconsumed input.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, id) = token(input)?;
    let (rest, gen) = token(rest)?;
    let (rest, marker) = token(rest)?;
    let (Token::Integer(id), Token::Integer(gen), Token::ObjStart) = (id, gen, marker) else {
        return Err(parse_failure(input));
    };
    let (rest, object) = parse_object(rest)?;
    // A missing endobj is tolerated; the next header starts a new object
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => rest,
    };
    Ok((rest, (ObjectRef::new(id as u32, gen as u16), object)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let (_, obj) = parse_object(b"12 0 R").unwrap();
        assert_eq!(obj, Object::Reference(ObjectRef::new(12, 0)));
    }

    #[test]
    fn test_operand_parsing_does_not_build_references() {
        let (rest, obj) = parse_operand(b"1 0 R").unwrap();
        assert_eq!(obj, Object::Integer(1));
        assert_eq!(rest, b" 0 R");
    }

    #[test]
    fn test_parse_nested_dictionary() {
        let (_, obj) = parse_object(b"<< /Type /Annot /Rect [0 0 10 10] /AP << /N 5 0 R >> >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("Annot"));
        assert_eq!(dict.get("Rect").and_then(Object::as_array).map(Vec::len), Some(4));
        let ap = dict.get("AP").and_then(Object::as_dict).unwrap();
        assert_eq!(ap.get("N"), Some(&Object::Reference(ObjectRef::new(5, 0))));
    }

    #[test]
    fn test_parse_stream_with_length() {
        let input = b"<< /Length 5 >>\nstream\nq 1 Q\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        assert_eq!(obj.stream_data(), Some(&b"q 1 Q"[..]));
    }

    #[test]
    fn test_parse_stream_with_wrong_length_falls_back() {
        let input = b"<< /Length 99 >>\nstream\nabc\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        assert_eq!(obj.stream_data(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_parse_indirect_object() {
        let (_, (r, obj)) = parse_indirect_object(b"7 0 obj\n<< /S /Launch >>\nendobj\n").unwrap();
        assert_eq!(r, ObjectRef::new(7, 0));
        assert_eq!(obj.as_dict().and_then(|d| d.get("S")), Some(&Object::name("Launch")));
    }

    #[test]
    fn test_decode_hex_odd_length() {
        assert_eq!(decode_hex(b"41 4").unwrap(), vec![0x41, 0x40]);
        assert!(decode_hex(b"zz").is_err());
    }

    #[test]
    fn test_decode_octal_escape() {
        assert_eq!(decode_literal_string_escapes(b"\\101\\7"), vec![b'A', 7]);
    }
}
