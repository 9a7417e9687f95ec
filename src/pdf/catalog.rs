//! Document assembly: object scan, object-stream expansion, page tree.
//!
//! Instead of trusting cross-reference tables (modern generators write
//! xref streams, incremental updates, hybrid files), the whole file is
//! scanned for `N G obj … endobj` slots and every parseable object goes
//! into a sparse map; `/Type /ObjStm` containers are expanded the same
//! way. That single pass covers classic files, xref-stream files and
//! mildly damaged ones alike, and the page tree is then walked from the
//! `/Type /Catalog` object.

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::cmap::{parse_tounicode, ToUnicodeMap};
use super::decode::decode_stream;
use super::lexer::{is_delimiter, is_whitespace, parse_object, skip_ws};
use super::object::{ObjectRef, PdfObject};

/// Guard against reference cycles in malformed page trees.
const MAX_TREE_DEPTH: u32 = 32;

/// Returned for dangling references and resolution cycles.
static NULL_OBJECT: PdfObject = PdfObject::Null;

/// A font as the span extractor needs it.
#[derive(Debug, Clone, Default)]
pub struct Font {
    /// Composite (Type0) fonts consume two-byte codes
    pub two_byte: bool,
    /// Decoded ToUnicode mapping, when the font embeds one
    pub to_unicode: Option<ToUnicodeMap>,
}

/// One leaf of the page tree, ready for content interpretation.
#[derive(Debug, Clone)]
pub struct PageNode {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// MediaBox origin, subtracted from device coordinates
    pub origin: (f32, f32),
    /// Concatenated decoded content streams
    pub content: Vec<u8>,
    /// Fonts by resource name (`F1`, `TT0`, …)
    pub fonts: HashMap<String, Font>,
}

/// A parsed document: the sparse object map.
#[derive(Debug)]
pub struct Document {
    objects: HashMap<u32, PdfObject>,
}

impl Document {
    /// Parse a PDF from bytes.
    pub fn parse(bytes: &[u8]) -> Result<Document> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(Error::InvalidDocument(
                "missing %PDF- header".to_string(),
            ));
        }

        let mut objects = scan_objects(bytes);
        expand_object_streams(&mut objects);

        if objects.is_empty() {
            return Err(Error::InvalidDocument("no objects found".to_string()));
        }

        log::debug!("parsed {} objects", objects.len());
        Ok(Document { objects })
    }

    /// Fetch an object by reference.
    pub fn get(&self, reference: ObjectRef) -> Option<&PdfObject> {
        self.objects.get(&reference.number)
    }

    /// Follow references until a direct object (bounded against cycles).
    pub fn resolve<'a>(&'a self, mut obj: &'a PdfObject) -> &'a PdfObject {
        for _ in 0..MAX_TREE_DEPTH {
            match obj {
                PdfObject::Reference(r) => match self.get(*r) {
                    Some(inner) => obj = inner,
                    None => return &NULL_OBJECT,
                },
                _ => return obj,
            }
        }
        &NULL_OBJECT
    }

    fn resolved_dict_entry<'a>(
        &'a self,
        dict: &'a HashMap<String, PdfObject>,
        key: &str,
    ) -> Option<&'a PdfObject> {
        dict.get(key).map(|obj| self.resolve(obj))
    }

    /// Collect the document's pages in tree order.
    pub fn pages(&self) -> Result<Vec<PageNode>> {
        let root = self
            .objects
            .values()
            .find(|obj| {
                obj.as_dict()
                    .and_then(|d| d.get("Type"))
                    .and_then(PdfObject::as_name)
                    == Some("Catalog")
            })
            .and_then(|catalog| catalog.as_dict()?.get("Pages").cloned())
            .or_else(|| {
                // Damaged catalog: fall back to a parentless /Pages node.
                self.objects
                    .iter()
                    .find(|(_, obj)| {
                        let Some(dict) = obj.as_dict() else {
                            return false;
                        };
                        dict.get("Type").and_then(PdfObject::as_name) == Some("Pages")
                            && !dict.contains_key("Parent")
                    })
                    .map(|(number, _)| {
                        PdfObject::Reference(ObjectRef {
                            number: *number,
                            generation: 0,
                        })
                    })
            })
            .ok_or_else(|| Error::InvalidDocument("no page tree root".to_string()))?;

        let mut pages = Vec::new();
        self.collect_pages(&root, None, None, &mut pages, 0)?;
        if pages.is_empty() {
            return Err(Error::InvalidDocument("page tree has no pages".to_string()));
        }
        Ok(pages)
    }

    fn collect_pages(
        &self,
        node: &PdfObject,
        inherited_media_box: Option<[f32; 4]>,
        inherited_resources: Option<&HashMap<String, PdfObject>>,
        out: &mut Vec<PageNode>,
        depth: u32,
    ) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::InvalidDocument(
                "page tree recursion limit exceeded".to_string(),
            ));
        }

        let node = self.resolve(node);
        let Some(dict) = node.as_dict() else {
            return Ok(());
        };

        let media_box = self
            .resolved_dict_entry(dict, "MediaBox")
            .and_then(|obj| self.media_box_of(obj))
            .or(inherited_media_box);
        let resources = self
            .resolved_dict_entry(dict, "Resources")
            .and_then(PdfObject::as_dict)
            .or(inherited_resources);

        match dict.get("Type").and_then(PdfObject::as_name) {
            Some("Pages") => {
                let kids = self
                    .resolved_dict_entry(dict, "Kids")
                    .and_then(|o| o.as_array().map(|a| a.to_vec()))
                    .unwrap_or_default();
                for kid in &kids {
                    self.collect_pages(kid, media_box, resources, out, depth + 1)?;
                }
            }
            Some("Page") => {
                // US Letter when nothing is declared anywhere.
                let media_box = media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]);
                let content = self.page_content(dict);
                let fonts = resources
                    .map(|r| self.page_fonts(r))
                    .unwrap_or_default();
                out.push(PageNode {
                    width: (media_box[2] - media_box[0]).abs(),
                    height: (media_box[3] - media_box[1]).abs(),
                    origin: (media_box[0], media_box[1]),
                    content,
                    fonts,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn media_box_of(&self, obj: &PdfObject) -> Option<[f32; 4]> {
        let array = obj.as_array()?;
        if array.len() != 4 {
            return None;
        }
        let mut values = [0.0f32; 4];
        for (i, item) in array.iter().enumerate() {
            values[i] = self.resolve(item).as_f64()? as f32;
        }
        Some(values)
    }

    /// Concatenated decoded content streams of a page.
    fn page_content(&self, page_dict: &HashMap<String, PdfObject>) -> Vec<u8> {
        let mut content = Vec::new();
        let streams: Vec<&PdfObject> = match page_dict.get("Contents").map(|o| self.resolve(o)) {
            Some(PdfObject::Array(items)) => items.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        };

        for stream in streams {
            if let PdfObject::Stream { dict, data } = self.resolve(stream) {
                match decode_stream(dict, data) {
                    Ok(mut decoded) => {
                        content.append(&mut decoded);
                        content.push(b'\n');
                    }
                    Err(err) => log::warn!("skipping undecodable content stream: {err}"),
                }
            }
        }
        content
    }

    /// Fonts reachable from a page's resources.
    fn page_fonts(&self, resources: &HashMap<String, PdfObject>) -> HashMap<String, Font> {
        let mut fonts = HashMap::new();
        let Some(font_dict) = self
            .resolved_dict_entry(resources, "Font")
            .and_then(PdfObject::as_dict)
        else {
            return fonts;
        };

        for (name, font_ref) in font_dict {
            let Some(dict) = self.resolve(font_ref).as_dict() else {
                continue;
            };
            let two_byte = dict.get("Subtype").and_then(PdfObject::as_name) == Some("Type0");
            let to_unicode = match dict.get("ToUnicode").map(|o| self.resolve(o)) {
                Some(PdfObject::Stream { dict, data }) => match decode_stream(dict, data) {
                    Ok(decoded) => {
                        let map = parse_tounicode(&decoded);
                        if map.is_empty() {
                            None
                        } else {
                            Some(map)
                        }
                    }
                    Err(err) => {
                        log::warn!("undecodable ToUnicode stream for {name}: {err}");
                        None
                    }
                },
                _ => None,
            };
            fonts.insert(name.clone(), Font {
                two_byte,
                to_unicode,
            });
        }
        fonts
    }
}

/// Scan the whole file for `N G obj` slots.
fn scan_objects(bytes: &[u8]) -> HashMap<u32, PdfObject> {
    let mut objects = HashMap::new();
    let mut pos = 0;

    while let Some(found) = find_keyword(bytes, pos, b"obj") {
        pos = found + 3;

        let Some((number, _generation)) = read_object_header(bytes, found) else {
            continue;
        };

        let body = &bytes[pos..];
        let Ok((rest, obj)) = parse_object(body) else {
            continue;
        };

        let consumed = body.len() - rest.len();
        let after = skip_ws(rest);

        let obj = if let (PdfObject::Dictionary(dict), true) =
            (&obj, after.starts_with(b"stream"))
        {
            let stream_body = &after[b"stream".len()..];
            let data_start = match stream_body {
                [b'\r', b'\n', ..] => 2,
                [b'\n', ..] | [b'\r', ..] => 1,
                _ => 0,
            };
            let stream_body = &stream_body[data_start..];
            let Some(end) = find_bytes(stream_body, b"endstream") else {
                continue;
            };
            let mut data = &stream_body[..end];
            // The EOL before endstream is a marker, not payload.
            if data.ends_with(b"\r\n") {
                data = &data[..data.len() - 2];
            } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
                data = &data[..data.len() - 1];
            }
            pos = bytes.len() - stream_body.len() + end + b"endstream".len();
            PdfObject::Stream {
                dict: dict.clone(),
                data: data.to_vec(),
            }
        } else {
            pos += consumed;
            obj
        };

        objects.insert(number, obj);
    }

    objects
}

/// Backtrack from an `obj` keyword to its `N G` header.
fn read_object_header(bytes: &[u8], obj_pos: usize) -> Option<(u32, u16)> {
    // The keyword must stand alone.
    if bytes
        .get(obj_pos + 3)
        .is_some_and(|&b| !is_whitespace(b) && !is_delimiter(b))
    {
        return None;
    }

    let read_digits_back = |mut end: usize| -> Option<(u64, usize)> {
        let digits_end = end;
        while end > 0 && bytes[end - 1].is_ascii_digit() {
            end -= 1;
        }
        if end == digits_end {
            return None;
        }
        let text = std::str::from_utf8(&bytes[end..digits_end]).ok()?;
        Some((text.parse().ok()?, end))
    };
    let skip_ws_back = |mut end: usize| -> Option<usize> {
        let start = end;
        while end > 0 && is_whitespace(bytes[end - 1]) {
            end -= 1;
        }
        (end < start).then_some(end)
    };

    let end = skip_ws_back(obj_pos)?;
    let (generation, end) = read_digits_back(end)?;
    let end = skip_ws_back(end)?;
    let (number, end) = read_digits_back(end)?;
    // The object number must start at a token boundary.
    if end > 0 && !is_whitespace(bytes[end - 1]) && !is_delimiter(bytes[end - 1]) {
        return None;
    }
    Some((number as u32, generation as u16))
}

/// Expand `/Type /ObjStm` containers into the object map.
fn expand_object_streams(objects: &mut HashMap<u32, PdfObject>) {
    let containers: Vec<(HashMap<String, PdfObject>, Vec<u8>)> = objects
        .values()
        .filter_map(|obj| match obj {
            PdfObject::Stream { dict, data }
                if dict.get("Type").and_then(PdfObject::as_name) == Some("ObjStm") =>
            {
                Some((dict.clone(), data.clone()))
            }
            _ => None,
        })
        .collect();

    for (dict, data) in containers {
        let Ok(decoded) = decode_stream(&dict, &data) else {
            continue;
        };
        let count = dict.get("N").and_then(PdfObject::as_i64).unwrap_or(0) as usize;
        let first = dict.get("First").and_then(PdfObject::as_i64).unwrap_or(0) as usize;

        // Header: N pairs of "objnum offset".
        let mut header = &decoded[..first.min(decoded.len())];
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let Ok((rest, PdfObject::Integer(number))) = parse_object(header) else {
                break;
            };
            let Ok((rest, PdfObject::Integer(offset))) = parse_object(rest) else {
                break;
            };
            entries.push((number as u32, offset as usize));
            header = rest;
        }

        for (number, offset) in entries {
            let start = first + offset;
            if start >= decoded.len() {
                continue;
            }
            if let Ok((_, obj)) = parse_object(&decoded[start..]) {
                objects.entry(number).or_insert(obj);
            }
        }
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Find the next stand-alone occurrence of `needle` at or after `from`.
fn find_keyword(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    let mut pos = from;
    while pos + needle.len() <= bytes.len() {
        match find_bytes(&bytes[pos..], needle) {
            Some(offset) => {
                let found = pos + offset;
                let before_ok = found == 0 || is_whitespace(bytes[found - 1]);
                if before_ok {
                    return Some(found);
                }
                pos = found + 1;
            }
            None => return None,
        }
    }
    None
}
