//! Layout model: positioned text spans and their assembly into lines.
//!
//! A layout backend yields raw spans per page: text, a bounding box in page
//! points (top-left origin), and a font size. This module normalizes the
//! boxes to page-relative [0,1] coordinates and groups consecutive spans
//! into visual lines by baseline proximity. Everything downstream (price
//! location, block clustering, hygiene) works on the assembled [`Page`]s.
//!
//! The backend is a trait so any decoder producing the raw shape can be
//! plugged in; the default implementation is [`crate::pdf::PdfExtractor`].

use crate::error::Result;
use crate::geometry::Rect;
use crate::hygiene::clean_text;

/// A raw text run as produced by a layout backend.
///
/// Coordinates are in page points with the origin at the top-left corner
/// and y increasing downward. `font_size` is the effective size in points
/// after any text-matrix scaling.
#[derive(Debug, Clone)]
pub struct RawSpan {
    /// The text of the run
    pub text: String,
    /// Left edge in points
    pub x0: f32,
    /// Top edge in points
    pub y0: f32,
    /// Right edge in points
    pub x1: f32,
    /// Bottom edge in points
    pub y1: f32,
    /// Effective font size in points
    pub font_size: f32,
}

/// One page of raw spans in the decoder's natural reading order.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Spans in reading order
    pub spans: Vec<RawSpan>,
}

/// The decoder seam: anything that can turn PDF bytes into positioned spans.
///
/// Implementations must fail with [`crate::error::Error::InvalidDocument`]
/// when the bytes are not a decodable PDF; pages without a text layer yield
/// an empty span list and are not an error.
pub trait LayoutExtractor {
    /// Decode `pdf_bytes` into per-page raw spans.
    fn extract(&self, pdf_bytes: &[u8]) -> Result<Vec<RawPage>>;
}

/// A text span after normalization: immutable atomic unit of layout.
#[derive(Debug, Clone)]
pub struct Span {
    /// The text of the run
    pub text: String,
    /// Bounding box in normalized [0,1] page coordinates
    pub bbox: Rect,
    /// Font size in points
    pub font_size: f32,
    /// 1-based page number
    pub page: u32,
    /// Index of the line this span belongs to on its page
    pub line_index: usize,
}

/// A visual line: consecutive spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct Line {
    /// Cleaned, whitespace-collapsed text of the line
    pub text: String,
    /// Left edge of the line in unnormalized points (column detection unit)
    pub x_pt: f32,
    /// Index of this line on its page
    pub index: usize,
    /// Bounding box in normalized [0,1] page coordinates
    pub bbox: Rect,
    /// 1-based page number
    pub page: u32,
}

/// A fully assembled page: normalized spans plus their line grouping.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    /// Page width in points
    pub width_pt: f32,
    /// Page height in points
    pub height_pt: f32,
    /// Spans in reading order, annotated with line indices
    pub spans: Vec<Span>,
    /// Assembled lines (only lines with non-empty cleaned text)
    pub lines: Vec<Line>,
}

/// Spans belong to the same line when their baselines sit within half the
/// smaller span height of each other.
fn same_baseline(a: &RawSpan, b: &RawSpan) -> bool {
    let h_a = (a.y1 - a.y0).abs().max(1.0);
    let h_b = (b.y1 - b.y0).abs().max(1.0);
    (a.y1 - b.y1).abs() <= 0.5 * h_a.min(h_b)
}

/// Assemble raw pages into the normalized page model.
///
/// Line indices count only lines whose cleaned text is non-empty, matching
/// the numbering the price locator and block clusterer operate on. Spans of
/// a dropped (empty) line keep the index of the next emitted line; they
/// carry no text so nothing downstream observes them.
pub fn build_pages(raw_pages: Vec<RawPage>) -> Vec<Page> {
    let mut pages = Vec::with_capacity(raw_pages.len());

    for (page_idx, raw) in raw_pages.into_iter().enumerate() {
        let number = page_idx as u32 + 1;
        let width = raw.width.max(1.0);
        let height = raw.height.max(1.0);

        let mut spans: Vec<Span> = Vec::with_capacity(raw.spans.len());
        let mut lines: Vec<Line> = Vec::new();

        let mut current: Vec<RawSpan> = Vec::new();
        let flush =
            |group: &mut Vec<RawSpan>, spans: &mut Vec<Span>, lines: &mut Vec<Line>| {
                if group.is_empty() {
                    return;
                }
                let joined: String = group.iter().map(|s| s.text.as_str()).collect();
                let text = clean_text(&joined);

                let x0 = group.iter().map(|s| s.x0).fold(f32::INFINITY, f32::min);
                let y0 = group.iter().map(|s| s.y0).fold(f32::INFINITY, f32::min);
                let x1 = group.iter().map(|s| s.x1).fold(f32::NEG_INFINITY, f32::max);
                let y1 = group.iter().map(|s| s.y1).fold(f32::NEG_INFINITY, f32::max);
                let line_bbox =
                    Rect::from_points(x0 / width, y0 / height, x1 / width, y1 / height);

                let index = lines.len();
                for s in group.drain(..) {
                    spans.push(Span {
                        bbox: Rect::from_points(
                            s.x0 / width,
                            s.y0 / height,
                            s.x1 / width,
                            s.y1 / height,
                        ),
                        text: s.text,
                        font_size: s.font_size,
                        page: number,
                        line_index: index,
                    });
                }
                if !text.is_empty() {
                    lines.push(Line {
                        text,
                        x_pt: x0,
                        index,
                        bbox: line_bbox,
                        page: number,
                    });
                }
            };

        for span in raw.spans {
            if span.text.is_empty() {
                continue;
            }
            let breaks = match current.last() {
                Some(last) => !same_baseline(last, &span),
                None => false,
            };
            if breaks {
                flush(&mut current, &mut spans, &mut lines);
            }
            current.push(span);
        }
        flush(&mut current, &mut spans, &mut lines);

        log::debug!(
            "page {}: {} spans assembled into {} lines",
            number,
            spans.len(),
            lines.len()
        );

        pages.push(Page {
            number,
            width_pt: width,
            height_pt: height,
            spans,
            lines,
        });
    }

    pages
}
