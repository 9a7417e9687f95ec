//! The bbox cropper seam: an opaque image-producing collaborator.
//!
//! The review UI wants a PNG of each offer's bounding box. Rendering and
//! uploading is plumbing outside the core, so it enters through a trait;
//! a failing or absent cropper degrades silently and the offer is emitted
//! without a crop URL. Offer ids are deterministic hashes so repeated
//! scans overwrite the same blobs instead of accumulating new ones.

use sha2::{Digest, Sha256};

use crate::geometry::Rect;

/// Renders an offer's bounding box to an image and returns its URL.
pub trait Cropper: Send + Sync {
    /// Crop `bbox` (normalized coordinates) of `page` out of the PDF.
    /// `None` means the crop failed; the scan continues without it.
    fn crop(&self, pdf_bytes: &[u8], page: u32, bbox: Rect, offer_id: &str) -> Option<String>;
}

/// Deterministic offer id for blob naming:
/// `{retailer}-p{page}-{12 hex chars of sha256}`.
pub fn generate_offer_id(retailer: &str, page: u32, bbox: Rect, product_text: &str) -> String {
    let (x0, y0, x1, y1) = bbox.corners();
    let text_prefix: String = product_text.chars().take(50).collect();
    let content = format!("{retailer}|{page}|({x0:.4}, {y0:.4}, {x1:.4}, {y1:.4})|{text_prefix}");

    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();

    format!("{}-p{}-{}", retailer.to_lowercase(), page, &hex[..12])
}
