//! The output model: offers and the scan result envelope.
//!
//! These are the closed record types the downstream poster serializes and
//! ships. Optional fields are skipped when absent so that two scans of the
//! same input produce byte-identical JSON; nothing here carries a wall
//! clock timestamp.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::confidence::{ConfidenceDetails, OfferStatus};
use crate::units::{AmountUnit, Container, UnitPriceUnit};

/// Payload schema version.
pub const RESULT_VERSION: &str = "2.0";

/// Where an offer was found, for the review UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferTrace {
    /// 1-based page number
    pub page: u32,
    /// Offer block bounding box (x0, y0, x1, y1) in normalized coordinates
    pub bbox: [f32; 4],
    /// The source lines of the block
    pub text_lines: Vec<String>,
    /// The scanned file, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

/// The readings considered for an offer, emitted in learning mode so
/// reviewers can see what the pipeline chose between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCandidates {
    /// Every price anchor in the block's range
    pub price_candidates: Vec<f64>,
    /// Every quantity reading in the block's text
    pub amount_candidates: Vec<String>,
    /// The reading the pipeline selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
}

/// One extracted offer. Created by the deriver, never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// The raw merged product text from the flyer
    pub product_text_raw: String,

    /// Normalized brand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_norm: Option<String>,
    /// Normalized product name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_norm: Option<String>,
    /// Normalized variant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_norm: Option<String>,
    /// Category from the taxonomy
    pub category: String,

    /// Package amount value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount_value: Option<f64>,
    /// Package amount unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount_unit: Option<AmountUnit>,
    /// Multipack count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_count: Option<u32>,
    /// Container type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_type: Option<Container>,

    /// Offer price in kroner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_value: Option<f64>,
    /// Deposit in kroner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_value: Option<f64>,
    /// Price with the deposit removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_excl_deposit: Option<f64>,

    /// Computed per-unit price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price_value: Option<f64>,
    /// Unit of the per-unit price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price_unit: Option<UnitPriceUnit>,

    /// Deterministic identity key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_key: Option<String>,
    /// Restrictions or remarks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Overall confidence, rounded to two decimals
    pub confidence: f64,
    /// Per-factor confidence scores
    pub confidence_details: ConfidenceDetails,
    /// Human-readable scoring reasons
    pub confidence_reasons: Vec<String>,
    /// Publication status
    pub status: OfferStatus,

    /// Set on repeats of a `(product, price)` pair within one scan
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_duplicate: bool,
    /// Page of the first occurrence, on duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen_page: Option<u32>,
    /// 1-based occurrence counter, on duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<u32>,

    /// Review-UI crop of the offer's bounding box
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_url: Option<String>,

    /// Source location of the offer
    pub trace: OfferTrace,

    /// All readings considered (learning mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<OfferCandidates>,
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanMeta {
    /// Detected retailer id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retailer: Option<String>,
    /// First day of the validity window (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    /// Last day of the validity window (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
    /// The scanned file, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Retailer detection confidence
    pub retailer_confidence: f64,
    /// Validity detection confidence
    pub validity_confidence: f64,
}

/// Aggregate scan statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanStats {
    /// Pages in the document
    pub total_pages: u32,
    /// Offer blocks clustered across all pages
    pub total_blocks: usize,
    /// Offer candidates before validation
    pub offers_detected: usize,
    /// Offers surviving validation
    pub offers_extracted: usize,
    /// The scanner version that produced this result
    pub scanner_version: String,
    /// Offers at or above 0.8 confidence
    pub high_confidence: usize,
    /// Offers flagged for review
    pub needs_review: usize,
    /// Offers flagged as duplicates
    pub duplicates: usize,
    /// Offer count per category
    pub categories: BTreeMap<String, usize>,
}

/// The complete result of scanning one flyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Payload schema version
    pub version: String,
    /// Document-level metadata
    pub meta: ScanMeta,
    /// Aggregate statistics
    pub scan_stats: ScanStats,
    /// Extracted offers in page order
    pub offers: Vec<Offer>,
}

impl ScanResult {
    /// A scan that completed but produced nothing.
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}
