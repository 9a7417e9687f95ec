//! Content-stream interpretation: text operators to positioned spans.
//!
//! Executes the text subset of the content operator set (PDF 32000-1:2008
//! §9.4): `BT`/`ET`, the positioning operators `Td`/`TD`/`T*`/`TL`/`Tm`,
//! font selection `Tf`, the show operators `Tj`/`TJ`/`'`/`"`, plus the
//! graphics-state operators `q`/`Q`/`cm` that affect where text lands.
//! Everything else only clears the operand stack.
//!
//! Glyph metrics are not consulted: span width is estimated from the
//! character count, which is precise enough for column clustering and
//! price-register positions, the consumers of these boxes.

use crate::layout::RawSpan;

use super::catalog::{Font, PageNode};
use super::lexer::{is_delimiter, is_whitespace, parse_object, skip_ws};
use super::object::PdfObject;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;

/// TJ offsets at or below this (thousandths of text space) are word gaps.
const TJ_SPACE_THRESHOLD: f64 = -180.0;

/// A 2D affine transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    fn identity() -> Self {
        Matrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    /// `self` applied first, then `other`.
    fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of a unit vertical vector under this matrix.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

enum ContentToken {
    Operand(PdfObject),
    Operator(String),
}

fn next_content_token(input: &[u8]) -> Option<(&[u8], ContentToken)> {
    let input = skip_ws(input);
    let &first = input.first()?;

    let starts_object = first.is_ascii_digit()
        || matches!(first, b'+' | b'-' | b'.' | b'(' | b'<' | b'[' | b'/');
    if starts_object {
        return match parse_object(input) {
            Ok((rest, obj)) => Some((rest, ContentToken::Operand(obj))),
            Err(_) => Some((&input[1..], ContentToken::Operator(String::new()))),
        };
    }

    let mut end = 0;
    while input
        .get(end)
        .is_some_and(|&b| !is_whitespace(b) && !is_delimiter(b))
    {
        end += 1;
    }
    if end == 0 {
        return Some((&input[1..], ContentToken::Operator(String::new())));
    }
    let word = String::from_utf8_lossy(&input[..end]).into_owned();
    let rest = &input[end..];
    match word.as_str() {
        "true" => Some((rest, ContentToken::Operand(PdfObject::Boolean(true)))),
        "false" => Some((rest, ContentToken::Operand(PdfObject::Boolean(false)))),
        "null" => Some((rest, ContentToken::Operand(PdfObject::Null))),
        _ => Some((rest, ContentToken::Operator(word))),
    }
}

/// Decode a show-operator string through the selected font.
fn decode_text(bytes: &[u8], font: Option<&Font>) -> String {
    let mut out = String::new();
    match font {
        Some(font) if font.two_byte => {
            for pair in bytes.chunks(2) {
                let code = ((pair[0] as u32) << 8) | *pair.get(1).unwrap_or(&0) as u32;
                match font.to_unicode.as_ref().and_then(|m| m.get(code)) {
                    Some(text) => out.push_str(text),
                    None => out.push(char::REPLACEMENT_CHARACTER),
                }
            }
        }
        Some(font) if font.to_unicode.is_some() => {
            let map = font.to_unicode.as_ref().unwrap();
            for &b in bytes {
                match map.get(b as u32) {
                    Some(text) => out.push_str(text),
                    // Unmapped single-byte codes are almost always the
                    // Latin-1 identity in these flyers.
                    None => out.push(b as char),
                }
            }
        }
        _ => {
            for &b in bytes {
                out.push(b as char);
            }
        }
    }
    out
}

struct TextState {
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font_size: f32,
    font_name: Option<String>,
}

impl TextState {
    fn new() -> Self {
        TextState {
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            leading: 0.0,
            font_size: 0.0,
            font_name: None,
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }
}

/// Interpret a page's content stream into raw spans in stream order.
pub fn extract_spans(page: &PageNode) -> Vec<RawSpan> {
    let mut spans = Vec::new();
    let mut input = page.content.as_slice();

    let mut ctm = Matrix::identity();
    let mut ctm_stack: Vec<Matrix> = Vec::new();
    let mut text = TextState::new();
    let mut operands: Vec<PdfObject> = Vec::new();

    let number = |operands: &[PdfObject], i: usize| -> f32 {
        operands.get(i).and_then(PdfObject::as_f64).unwrap_or(0.0) as f32
    };

    while let Some((rest, token)) = next_content_token(input) {
        input = rest;
        let op = match token {
            ContentToken::Operand(obj) => {
                operands.push(obj);
                continue;
            }
            ContentToken::Operator(op) => op,
        };

        match op.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(previous) = ctm_stack.pop() {
                    ctm = previous;
                }
            }
            "cm" => {
                if operands.len() >= 6 {
                    let m = Matrix {
                        a: number(&operands, 0),
                        b: number(&operands, 1),
                        c: number(&operands, 2),
                        d: number(&operands, 3),
                        e: number(&operands, 4),
                        f: number(&operands, 5),
                    };
                    ctm = m.multiply(&ctm);
                }
            }
            "BT" => {
                text.tm = Matrix::identity();
                text.tlm = Matrix::identity();
            }
            "ET" => {}
            "Tf" => {
                text.font_name = operands
                    .first()
                    .and_then(|o| o.as_name().map(str::to_string));
                text.font_size = number(&operands, 1);
            }
            "TL" => text.leading = number(&operands, 0),
            "Td" => text.next_line(number(&operands, 0), number(&operands, 1)),
            "TD" => {
                text.leading = -number(&operands, 1);
                text.next_line(number(&operands, 0), number(&operands, 1));
            }
            "T*" => text.next_line(0.0, -text.leading),
            "Tm" => {
                if operands.len() >= 6 {
                    text.tm = Matrix {
                        a: number(&operands, 0),
                        b: number(&operands, 1),
                        c: number(&operands, 2),
                        d: number(&operands, 3),
                        e: number(&operands, 4),
                        f: number(&operands, 5),
                    };
                    text.tlm = text.tm;
                }
            }
            "Tj" => {
                if let Some(PdfObject::String(bytes)) = operands.first() {
                    show_text(&bytes.clone(), page, &mut text, &ctm, &mut spans);
                }
            }
            "'" => {
                text.next_line(0.0, -text.leading);
                if let Some(PdfObject::String(bytes)) = operands.first() {
                    show_text(&bytes.clone(), page, &mut text, &ctm, &mut spans);
                }
            }
            "\"" => {
                text.next_line(0.0, -text.leading);
                if let Some(PdfObject::String(bytes)) = operands.get(2) {
                    show_text(&bytes.clone(), page, &mut text, &ctm, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfObject::Array(items)) = operands.first() {
                    let font = text
                        .font_name
                        .as_deref()
                        .and_then(|name| page.fonts.get(name));
                    let mut assembled = String::new();
                    for item in items {
                        match item {
                            PdfObject::String(bytes) => {
                                assembled.push_str(&decode_text(bytes, font));
                            }
                            other => {
                                if other.as_f64().unwrap_or(0.0) <= TJ_SPACE_THRESHOLD
                                    && !assembled.ends_with(' ')
                                {
                                    assembled.push(' ');
                                }
                            }
                        }
                    }
                    emit_span(assembled, page, &mut text, &ctm, &mut spans);
                }
            }
            "BI" => {
                // Inline image: skip the binary payload up to a
                // free-standing EI.
                input = skip_inline_image(input);
            }
            _ => {}
        }
        operands.clear();
    }

    spans
}

fn show_text(
    bytes: &[u8],
    page: &PageNode,
    text: &mut TextState,
    ctm: &Matrix,
    spans: &mut Vec<RawSpan>,
) {
    let font = text
        .font_name
        .as_deref()
        .and_then(|name| page.fonts.get(name));
    let decoded = decode_text(bytes, font);
    emit_span(decoded, page, text, ctm, spans);
}

fn emit_span(
    decoded: String,
    page: &PageNode,
    text: &mut TextState,
    ctm: &Matrix,
    spans: &mut Vec<RawSpan>,
) {
    if decoded.is_empty() {
        return;
    }

    let trm = text.tm.multiply(ctm);
    let size_pt = (text.font_size * trm.vertical_scale()).abs();

    let (device_x, device_y) = trm.transform(0.0, 0.0);
    let x = device_x - page.origin.0;
    let baseline = device_y - page.origin.1;

    let char_count = decoded.chars().count() as f32;
    let width = char_count * size_pt * GLYPH_WIDTH_FACTOR;

    // Device space is bottom-left origin; the span model is top-left.
    let y_bottom = page.height - baseline;
    let span = RawSpan {
        text: decoded,
        x0: x,
        y0: y_bottom - size_pt,
        x1: x + width,
        y1: y_bottom,
        font_size: size_pt,
    };
    if size_pt > 0.0 {
        spans.push(span);
    }

    // Advance the text matrix past what was shown.
    let advance = char_count * text.font_size * GLYPH_WIDTH_FACTOR;
    text.tm = Matrix::translation(advance, 0.0).multiply(&text.tm);
}

fn skip_inline_image(input: &[u8]) -> &[u8] {
    let mut i = 0;
    while i + 2 <= input.len() {
        if &input[i..i + 2] == b"EI"
            && (i == 0 || is_whitespace(input[i - 1]))
            && input.get(i + 2).map_or(true, |&b| is_whitespace(b))
        {
            return &input[i + 2..];
        }
        i += 1;
    }
    &input[input.len()..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn page_with(content: &str) -> PageNode {
        PageNode {
            width: 595.0,
            height: 842.0,
            origin: (0.0, 0.0),
            content: content.as_bytes().to_vec(),
            fonts: HashMap::new(),
        }
    }

    #[test]
    fn test_simple_tj() {
        let page = page_with("BT /F1 12 Tf 100 700 Td (Arla Letm\\346lk) Tj ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Arla Letmælk");
        assert_eq!(spans[0].font_size, 12.0);
        assert!((spans[0].x0 - 100.0).abs() < 1e-3);
        // Baseline at 700 from the bottom: bottom edge at 842 - 700 = 142.
        assert!((spans[0].y1 - 142.0).abs() < 1e-3);
    }

    #[test]
    fn test_tm_scaling_raises_effective_size() {
        // 12pt font under a 4x text matrix reads as 48pt.
        let page = page_with("BT /F1 12 Tf 4 0 0 4 50 600 Tm (15) Tj ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 1);
        assert!((spans[0].font_size - 48.0).abs() < 1e-3);
    }

    #[test]
    fn test_cm_scaling_composes() {
        let page = page_with("q 2 0 0 2 0 0 cm BT /F1 25 Tf (49) Tj ET Q");
        let spans = extract_spans(&page);
        assert!((spans[0].font_size - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_td_positions_successive_lines() {
        let page = page_with("BT /F1 10 Tf 100 700 Td (En) Tj 0 -14 Td (To) Tj ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 2);
        assert!(spans[1].y1 > spans[0].y1);
        assert!((spans[1].y1 - spans[0].y1 - 14.0).abs() < 1e-3);
    }

    #[test]
    fn test_tj_array_inserts_word_gaps() {
        let page = page_with("BT /F1 10 Tf 10 700 Td [(Hakket) -250 (oksek\\370d)] TJ ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hakket oksekød");
    }

    #[test]
    fn test_tj_array_small_offsets_are_kerning() {
        let page = page_with("BT /F1 10 Tf 10 700 Td [(V) -80 (and)] TJ ET");
        let spans = extract_spans(&page);
        assert_eq!(spans[0].text, "Vand");
    }

    #[test]
    fn test_consecutive_tj_spans_advance_x() {
        let page = page_with("BT /F1 60 Tf 100 300 Td (15) Tj (.-) Tj ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 2);
        assert!(spans[1].x0 > spans[0].x0);
        // Same baseline: the two spans form one visual line.
        assert!((spans[0].y1 - spans[1].y1).abs() < 1e-3);
    }

    #[test]
    fn test_quote_operator_advances_line() {
        let page = page_with("BT /F1 10 Tf 14 TL 100 700 Td (En) Tj (To) ' ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 2);
        assert!((spans[1].y1 - spans[0].y1 - 14.0).abs() < 1e-3);
    }

    #[test]
    fn test_inline_image_is_skipped() {
        let page = page_with("BI /W 2 /H 2 ID \x00\x01\x02\x03 EI BT /F1 10 Tf (Efter) Tj ET");
        let spans = extract_spans(&page);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Efter");
    }

    #[test]
    fn test_q_restores_ctm() {
        let page = page_with("q 10 0 0 10 0 0 cm Q BT /F1 12 Tf (a) Tj ET");
        let spans = extract_spans(&page);
        assert_eq!(spans[0].font_size, 12.0);
    }
}
