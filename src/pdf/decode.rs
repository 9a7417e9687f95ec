//! Stream filters: FlateDecode with PNG predictor support.
//!
//! Flyer PDFs compress everything with Flate; the other filters in the
//! spec (LZW, ASCII85, DCT, …) do not occur in text content streams from
//! the generators the chains use, so an unsupported filter is reported
//! rather than half-decoded.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};
use crate::pdf::object::PdfObject;

/// Apply a stream's filter chain to its raw data.
pub fn decode_stream(dict: &HashMap<String, PdfObject>, data: &[u8]) -> Result<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None => return Ok(data.to_vec()),
        Some(PdfObject::Name(name)) => vec![name.as_str()],
        Some(PdfObject::Array(items)) => items.iter().filter_map(|o| o.as_name()).collect(),
        Some(other) => {
            return Err(Error::Decode(format!("unexpected /Filter shape: {other:?}")));
        }
    };

    let mut decoded = data.to_vec();
    for filter in filters {
        decoded = match filter {
            "FlateDecode" | "Fl" => {
                let inflated = inflate(&decoded)?;
                apply_predictor(dict, inflated)?
            }
            other => return Err(Error::Decode(format!("unsupported filter: {other}"))),
        };
    }
    Ok(decoded)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        // Salvage what decompressed before a truncated tail; some
        // generators write sloppy stream ends.
        Err(err) if !out.is_empty() => {
            log::warn!("flate stream ended early ({err}); keeping {} bytes", out.len());
            Ok(out)
        }
        Err(err) => Err(Error::Decode(format!("flate: {err}"))),
    }
}

/// Undo the PNG row predictor (`/Predictor >= 10`).
fn apply_predictor(dict: &HashMap<String, PdfObject>, data: Vec<u8>) -> Result<Vec<u8>> {
    let parms = match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(obj) => match obj.as_dict() {
            Some(d) => d,
            None => return Ok(data),
        },
        None => return Ok(data),
    };

    let predictor = parms
        .get("Predictor")
        .and_then(PdfObject::as_i64)
        .unwrap_or(1);
    if predictor < 10 {
        return Ok(data);
    }

    let colors = parms.get("Colors").and_then(PdfObject::as_i64).unwrap_or(1) as usize;
    let bpc = parms
        .get("BitsPerComponent")
        .and_then(PdfObject::as_i64)
        .unwrap_or(8) as usize;
    let columns = parms.get("Columns").and_then(PdfObject::as_i64).unwrap_or(1) as usize;

    let bytes_per_pixel = (colors * bpc).div_ceil(8).max(1);
    let row_len = (columns * colors * bpc).div_ceil(8);
    let stride = row_len + 1;

    if row_len == 0 || data.len() % stride != 0 {
        return Err(Error::Decode("malformed predictor rows".to_string()));
    }

    let mut out = Vec::with_capacity(data.len() / stride * row_len);
    let mut previous = vec![0u8; row_len];

    for row in data.chunks(stride) {
        let tag = row[0];
        let mut current = row[1..].to_vec();
        match tag {
            0 => {}
            1 => {
                for i in bytes_per_pixel..row_len {
                    current[i] = current[i].wrapping_add(current[i - bytes_per_pixel]);
                }
            }
            2 => {
                for i in 0..row_len {
                    current[i] = current[i].wrapping_add(previous[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bytes_per_pixel {
                        current[i - bytes_per_pixel] as u16
                    } else {
                        0
                    };
                    let avg = ((left + previous[i] as u16) / 2) as u8;
                    current[i] = current[i].wrapping_add(avg);
                }
            }
            4 => {
                for i in 0..row_len {
                    let left = if i >= bytes_per_pixel {
                        current[i - bytes_per_pixel] as i16
                    } else {
                        0
                    };
                    let up = previous[i] as i16;
                    let up_left = if i >= bytes_per_pixel {
                        previous[i - bytes_per_pixel] as i16
                    } else {
                        0
                    };
                    current[i] = current[i].wrapping_add(paeth(left, up, up_left));
                }
            }
            other => {
                return Err(Error::Decode(format!("unknown PNG predictor tag {other}")));
            }
        }
        out.extend_from_slice(&current);
        previous = current;
    }

    Ok(out)
}

fn paeth(a: i16, b: i16, c: i16) -> u8 {
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}
