//! The bundled PDF layout backend.
//!
//! A purpose-built decoding slice: whole-file object scan, Flate stream
//! decoding, page-tree walk and a text-operator interpreter, producing the
//! raw positioned spans the pipeline consumes. It deliberately implements
//! only what span extraction needs: no glyph metrics, no images, no
//! interactive features.
//!
//! Any other decoder can replace it through [`crate::layout::LayoutExtractor`].

pub mod catalog;
pub mod cmap;
pub mod content;
pub mod decode;
pub mod lexer;
pub mod object;

use crate::error::Result;
use crate::layout::{LayoutExtractor, RawPage};

/// The default layout backend.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        PdfExtractor
    }
}

impl LayoutExtractor for PdfExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<Vec<RawPage>> {
        let document = catalog::Document::parse(pdf_bytes)?;
        let pages = document.pages()?;

        let raw_pages = pages
            .iter()
            .map(|page| RawPage {
                width: page.width,
                height: page.height,
                spans: content::extract_spans(page),
            })
            .collect::<Vec<_>>();

        log::info!(
            "decoded {} pages, {} spans",
            raw_pages.len(),
            raw_pages.iter().map(|p| p.spans.len()).sum::<usize>()
        );
        Ok(raw_pages)
    }
}
