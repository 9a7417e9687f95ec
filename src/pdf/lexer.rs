//! PDF object lexing and parsing.
//!
//! A recursive-descent parser over PDF's PostScript-like syntax, built on
//! nom. It produces [`PdfObject`]s directly; stream payloads are handled a
//! level up because their extent depends on the surrounding document.
//!
//! Token types (PDF 32000-1:2008 §7.3): numbers, literal `(…)` and hex
//! `<…>` strings, `/Names` with `#xx` escapes, arrays, dictionaries, the
//! keywords `true`/`false`/`null`, and `N G R` indirect references.

use nom::bytes::complete::{tag, take_while};
use nom::IResult;

use super::object::{ObjectRef, PdfObject};

/// PDF whitespace (PDF 32000-1:2008 table 1).
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters (table 2).
pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// A byte that ends a keyword or number token.
fn is_token_end(byte: u8) -> bool {
    is_whitespace(byte) || is_delimiter(byte)
}

/// Skip whitespace and `%` comments.
pub fn skip_ws(mut input: &[u8]) -> &[u8] {
    loop {
        let before = input.len();
        while let Some(&b) = input.first() {
            if is_whitespace(b) {
                input = &input[1..];
            } else {
                break;
            }
        }
        if input.first() == Some(&b'%') {
            while let Some(&b) = input.first() {
                if b == b'\r' || b == b'\n' {
                    break;
                }
                input = &input[1..];
            }
        }
        if input.len() == before {
            return input;
        }
    }
}

fn err(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Fail))
}

/// Parse an unsigned integer token.
fn parse_uint(input: &[u8]) -> IResult<&[u8], u64> {
    let (rest, digits) = take_while(|b: u8| b.is_ascii_digit())(input)?;
    if digits.is_empty() {
        return Err(err(input));
    }
    let mut value: u64 = 0;
    for &d in digits {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((d - b'0') as u64))
            .ok_or_else(|| err(input))?;
    }
    Ok((rest, value))
}

/// Parse a signed number into Integer or Real.
fn parse_number(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let mut i = 0;
    if matches!(input.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while let Some(&b) = input.get(i) {
        if b.is_ascii_digit() {
            seen_digit = true;
            i += 1;
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            i += 1;
        } else {
            break;
        }
    }
    if !seen_digit && !seen_dot {
        return Err(err(input));
    }
    let text = std::str::from_utf8(&input[..i]).map_err(|_| err(input))?;
    let rest = &input[i..];
    if seen_dot {
        let value: f64 = text.parse().map_err(|_| err(input))?;
        Ok((rest, PdfObject::Real(value)))
    } else {
        let value: i64 = text.parse().map_err(|_| err(input))?;
        Ok((rest, PdfObject::Integer(value)))
    }
}

/// Parse `N G R` starting at a digit. Fails without consuming if the shape
/// is not a reference.
fn parse_reference(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let (rest, number) = parse_uint(input)?;
    let after_number = skip_ws(rest);
    if after_number.len() == rest.len() {
        return Err(err(input));
    }
    let (rest, generation) = parse_uint(after_number)?;
    let after_generation = skip_ws(rest);
    if after_generation.len() == rest.len() {
        return Err(err(input));
    }
    let (rest, _) = tag(b"R".as_slice())(after_generation)?;
    if rest.first().is_some_and(|&b| !is_token_end(b)) {
        return Err(err(input));
    }
    Ok((
        rest,
        PdfObject::Reference(ObjectRef {
            number: number as u32,
            generation: generation as u16,
        }),
    ))
}

/// Parse `/Name`, decoding `#xx` escapes.
fn parse_name(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let (input, _) = tag(b"/".as_slice())(input)?;
    let mut name = Vec::new();
    let mut i = 0;
    while let Some(&b) = input.get(i) {
        if is_token_end(b) {
            break;
        }
        if b == b'#' {
            let hi = input.get(i + 1).and_then(|c| (*c as char).to_digit(16));
            let lo = input.get(i + 2).and_then(|c| (*c as char).to_digit(16));
            if let (Some(hi), Some(lo)) = (hi, lo) {
                name.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        name.push(b);
        i += 1;
    }
    let name = String::from_utf8_lossy(&name).into_owned();
    Ok((&input[i..], PdfObject::Name(name)))
}

/// Parse a literal `(…)` string with nesting and escapes.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let (input, _) = tag(b"(".as_slice())(input)?;
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 0;
    while let Some(&b) = input.get(i) {
        match b {
            b'\\' => {
                i += 1;
                match input.get(i) {
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'b') => out.push(0x08),
                    Some(b'f') => out.push(0x0C),
                    Some(b'(') => out.push(b'('),
                    Some(b')') => out.push(b')'),
                    Some(b'\\') => out.push(b'\\'),
                    // Line continuation: backslash before EOL drops both.
                    Some(b'\r') => {
                        if input.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    Some(b'\n') => {}
                    // Octal escape, up to three digits.
                    Some(&d) if d.is_ascii_digit() && d < b'8' => {
                        let mut value = (d - b'0') as u16;
                        let mut taken = 1;
                        while taken < 3 {
                            match input.get(i + taken) {
                                Some(&n) if n.is_ascii_digit() && n < b'8' => {
                                    value = value * 8 + (n - b'0') as u16;
                                    taken += 1;
                                }
                                _ => break,
                            }
                        }
                        i += taken - 1;
                        out.push(value as u8);
                    }
                    Some(&other) => out.push(other),
                    None => break,
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                out.push(b);
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], PdfObject::String(out)));
                }
                out.push(b);
                i += 1;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    Err(err(input))
}

/// Parse a hex `<…>` string.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let (input, _) = tag(b"<".as_slice())(input)?;
    let mut digits: Vec<u8> = Vec::new();
    let mut i = 0;
    while let Some(&b) = input.get(i) {
        if b == b'>' {
            if digits.len() % 2 == 1 {
                digits.push(0);
            }
            let bytes = digits
                .chunks(2)
                .map(|pair| pair[0] * 16 + pair[1])
                .collect();
            return Ok((&input[i + 1..], PdfObject::String(bytes)));
        }
        if let Some(value) = (b as char).to_digit(16) {
            digits.push(value as u8);
            i += 1;
        } else if is_whitespace(b) {
            i += 1;
        } else {
            return Err(err(input));
        }
    }
    Err(err(input))
}

/// Parse `[ … ]`.
fn parse_array(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let (mut input, _) = tag(b"[".as_slice())(input)?;
    let mut items = Vec::new();
    loop {
        input = skip_ws(input);
        if input.first() == Some(&b']') {
            return Ok((&input[1..], PdfObject::Array(items)));
        }
        let (rest, item) = parse_object(input)?;
        items.push(item);
        input = rest;
    }
}

/// Parse `<< /Key value … >>`.
fn parse_dictionary(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let (mut input, _) = tag(b"<<".as_slice())(input)?;
    let mut dict = std::collections::HashMap::new();
    loop {
        input = skip_ws(input);
        if input.starts_with(b">>") {
            return Ok((&input[2..], PdfObject::Dictionary(dict)));
        }
        let (rest, key) = parse_name(input)?;
        let rest = skip_ws(rest);
        let (rest, value) = parse_object(rest)?;
        if let PdfObject::Name(key) = key {
            dict.insert(key, value);
        }
        input = rest;
    }
}

/// Parse a bare keyword with a token boundary after it.
fn parse_keyword<'a>(input: &'a [u8], word: &str, value: PdfObject) -> IResult<&'a [u8], PdfObject> {
    let (rest, _) = tag(word.as_bytes())(input)?;
    if rest.first().is_some_and(|&b| !is_token_end(b)) {
        return Err(err(input));
    }
    Ok((rest, value))
}

/// Parse any PDF object. Leading whitespace and comments are skipped.
pub fn parse_object(input: &[u8]) -> IResult<&[u8], PdfObject> {
    let input = skip_ws(input);
    match input.first() {
        Some(b'<') if input.get(1) == Some(&b'<') => parse_dictionary(input),
        Some(b'<') => parse_hex_string(input),
        Some(b'(') => parse_literal_string(input),
        Some(b'/') => parse_name(input),
        Some(b'[') => parse_array(input),
        Some(b't') => parse_keyword(input, "true", PdfObject::Boolean(true)),
        Some(b'f') => parse_keyword(input, "false", PdfObject::Boolean(false)),
        Some(b'n') => parse_keyword(input, "null", PdfObject::Null),
        Some(&b) if b.is_ascii_digit() => parse_reference(input).or_else(|_| parse_number(input)),
        Some(b'+') | Some(b'-') | Some(b'.') => parse_number(input),
        _ => Err(err(input)),
    }
}
