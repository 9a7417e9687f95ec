//! The scanner: orchestrates the full extraction pipeline.
//!
//! ```text
//! PDF bytes
//!     ↓
//! [LayoutExtractor] (decoder seam → raw spans)
//!     ↓
//! Page[] (normalized spans + lines)
//!     ↓                         ↘ retailer / validity detection
//! [Price locator] → PriceAnchor[]
//!     ↓
//! [Block clusterer] → OfferBlock[]
//!     ↓
//! [Hygiene] (name merge, variants, quantities)
//!     ↓
//! [Normalizer] (model or rules, cached)
//!     ↓
//! [Deriver] (unit price, deposit, SKU, confidence)
//!     ↓
//! [Validator / dedup] → ScanResult
//! ```
//!
//! A scan is atomic from the caller's perspective: either a [`ScanResult`]
//! comes back (possibly with zero offers) or layout extraction failed with
//! [`crate::error::Error::InvalidDocument`]. Every other failure recovers
//! locally.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::blocks::{cluster_blocks, OfferBlock};
use crate::categories::{CachedCategories, CategorySource};
use crate::config::ScanConfig;
use crate::confidence::{
    calculate_confidence, status_from_confidence, ConfidenceInput, OfferStatus,
};
use crate::crop::{generate_offer_id, Cropper};
use crate::error::Result;
use crate::hygiene;
use crate::layout::{build_pages, LayoutExtractor, Page};
use crate::normalize::{NormalizeBackend, Normalizer};
use crate::offer::{
    Offer, OfferCandidates, OfferTrace, ScanMeta, ScanResult, ScanStats, RESULT_VERSION,
};
use crate::prices::locate_prices;
use crate::profile::RetailerProfile;
use crate::retailer::{detect_retailer, RETAILER_DETECTION_PAGES};
use crate::sku::generate_sku_key;
use crate::units::{calculate_price_excl_deposit, calculate_unit_price, estimate_deposit};
use crate::validity::{detect_validity, VALIDITY_DETECTION_PAGES};
use crate::SCANNER_VERSION;

lazy_static! {
    static ref RE_CAPITALIZED_WORD: Regex = Regex::new(r"[A-ZÆØÅ][a-zæøå]+").unwrap();
}

/// The scanner's external collaborators, wired in explicitly.
pub struct Services {
    /// The PDF decoder seam
    pub layout: Box<dyn LayoutExtractor>,
    /// Optional language-model normalization backend
    pub normalize: Option<Box<dyn NormalizeBackend>>,
    /// The category taxonomy source
    pub categories: Box<dyn CategorySource>,
    /// Optional bbox cropper for the review UI
    pub crop: Option<Box<dyn Cropper>>,
}

impl Services {
    /// Built-in collaborators: the bundled PDF extractor, rule-based
    /// normalization only, the built-in category table, no cropper.
    pub fn with_defaults() -> Self {
        Self {
            layout: Box::new(crate::pdf::PdfExtractor::new()),
            normalize: None,
            categories: Box::new(crate::categories::BuiltinCategories),
            crop: None,
        }
    }
}

/// One fully assembled offer candidate, pre-validation.
struct DraftOffer {
    offer: Offer,
    product_for_validation: String,
}

/// The flyer scanner.
pub struct Scanner {
    layout: Box<dyn LayoutExtractor>,
    normalizer: Normalizer,
    cropper: Option<Box<dyn Cropper>>,
    config: ScanConfig,
}

impl Scanner {
    /// Create a scanner from its collaborators and configuration.
    pub fn new(services: Services, config: ScanConfig) -> Self {
        let categories = Arc::new(CachedCategories::new(services.categories));
        let normalizer = Normalizer::new(services.normalize, categories)
            .with_cache_capacity(config.cache_capacity);
        Self {
            layout: services.layout,
            normalizer,
            cropper: services.crop,
            config,
        }
    }

    /// A scanner with default collaborators and configuration.
    pub fn with_defaults() -> Self {
        Self::new(Services::with_defaults(), ScanConfig::default())
    }

    /// Scan a flyer and extract its offers.
    pub fn scan(&self, pdf_bytes: &[u8], source_file: Option<&str>) -> Result<ScanResult> {
        let pages = build_pages(self.layout.extract(pdf_bytes)?);
        let total_pages = pages.len() as u32;

        let (retailer, retailer_confidence) =
            detect_retailer(&leading_text(&pages, RETAILER_DETECTION_PAGES));

        let reference_date = self
            .config
            .reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let (validity, validity_confidence) = detect_validity(
            &leading_text(&pages, VALIDITY_DETECTION_PAGES),
            reference_date,
        );

        let profile = RetailerProfile::for_retailer(retailer.as_deref());
        log::info!(
            "scanning {} pages as retailer={} (profile {})",
            total_pages,
            retailer.as_deref().unwrap_or("unknown"),
            profile.id
        );

        let mut total_blocks = 0usize;
        let mut drafts: Vec<DraftOffer> = Vec::new();

        for page in &pages {
            if let Some((from, to)) = self.config.page_range {
                if page.number < from || page.number > to {
                    continue;
                }
            }

            let anchors = locate_prices(page, profile);
            let blocks = cluster_blocks(
                page,
                profile,
                |text| hygiene::is_skip_line(text, profile.patterns),
                &anchors,
            );
            total_blocks += blocks.len();

            for block in &blocks {
                if let Some(draft) = self.block_to_offer(
                    block,
                    &anchors,
                    profile,
                    pdf_bytes,
                    retailer.as_deref(),
                    source_file,
                ) {
                    drafts.push(draft);
                }
            }
        }

        let offers_detected = drafts.len();
        let offers = self.validate_and_dedup(drafts);

        log::info!(
            "scan complete: {} blocks, {} candidates, {} offers",
            total_blocks,
            offers_detected,
            offers.len()
        );

        let mut stats = ScanStats {
            total_pages,
            total_blocks,
            offers_detected,
            offers_extracted: offers.len(),
            scanner_version: SCANNER_VERSION.to_string(),
            high_confidence: offers.iter().filter(|o| o.confidence >= 0.8).count(),
            needs_review: offers
                .iter()
                .filter(|o| o.status == OfferStatus::NeedsReview)
                .count(),
            duplicates: offers.iter().filter(|o| o.is_duplicate).count(),
            categories: Default::default(),
        };
        for offer in &offers {
            *stats.categories.entry(offer.category.clone()).or_insert(0) += 1;
        }

        Ok(ScanResult {
            version: RESULT_VERSION.to_string(),
            meta: ScanMeta {
                retailer,
                valid_from: validity.map(|w| w.from.format("%Y-%m-%d").to_string()),
                valid_to: validity.map(|w| w.to.format("%Y-%m-%d").to_string()),
                source_file: source_file.map(str::to_string),
                retailer_confidence,
                validity_confidence,
            },
            scan_stats: stats,
            offers,
        })
    }

    /// Assemble one block into an offer candidate.
    fn block_to_offer(
        &self,
        block: &OfferBlock,
        page_anchors: &[crate::prices::PriceAnchor],
        profile: &RetailerProfile,
        pdf_bytes: &[u8],
        retailer: Option<&str>,
        source_file: Option<&str>,
    ) -> Option<DraftOffer> {
        let line_texts: Vec<&str> = block.line_texts();

        let merged = hygiene::merge_product_name(&line_texts, profile.patterns);
        let cleaned = hygiene::clean_product_name(&merged);
        if cleaned.chars().count() < 2 {
            return None;
        }

        let (product_text, split_variants) = hygiene::split_variants(&cleaned);
        if product_text.chars().count() < 2 {
            return None;
        }
        if hygiene::is_app_offer(&product_text, profile.patterns)
            || hygiene::is_app_offer(&merged, profile.patterns)
        {
            return None;
        }

        let price_value = block.price.as_ref().map(|a| a.value);
        let quantity = hygiene::extract_quantity(&line_texts);
        let has_unit_price_text = hygiene::has_unit_price_text(&line_texts);
        let comment_text = hygiene::extract_comment(&line_texts);

        let detection = detection_confidence(
            &product_text,
            price_value,
            quantity.is_some(),
            has_unit_price_text,
        );

        let normalized = self.normalizer.normalize(&product_text, price_value);

        // Amounts: the normalizer's reading wins; the block's own quantity
        // text fills the gaps.
        let mut net_amount_value = normalized.net_amount_value;
        let mut net_amount_unit = normalized.net_amount_unit;
        if net_amount_value.is_none() {
            if let Some(q) = &quantity {
                net_amount_value = q.value;
                net_amount_unit = q.unit;
            }
        }
        let mut pack_count = normalized.pack_count;
        if pack_count.is_none() {
            pack_count = line_texts
                .iter()
                .filter_map(|t| hygiene::parse_quantity_text(t))
                .find_map(|(_, _, pack)| pack);
        }

        // Deposit: explicit from the normalizer, otherwise estimated when
        // the block text mentions pant.
        let deposit_value = normalized.deposit_value.or_else(|| {
            if hygiene::has_deposit_mention(&line_texts) {
                estimate_deposit(
                    normalized.container_type,
                    net_amount_value,
                    net_amount_unit,
                    pack_count,
                )
            } else {
                None
            }
        });

        let price_excl_deposit = calculate_price_excl_deposit(price_value, deposit_value);
        let unit_price = calculate_unit_price(
            price_value,
            deposit_value,
            net_amount_value,
            net_amount_unit,
            pack_count,
        );

        let variant_norm = normalized.variant_norm.clone().or_else(|| {
            if split_variants.is_empty() {
                None
            } else {
                Some(split_variants.join(", "))
            }
        });

        let product_norm = normalized
            .product_norm
            .clone()
            .unwrap_or_else(|| product_text.clone());

        let sku_key = generate_sku_key(
            normalized.brand_norm.as_deref(),
            Some(&product_norm),
            variant_norm.as_deref(),
            normalized.container_type,
            net_amount_value,
            net_amount_unit,
        );

        let confidence = calculate_confidence(&ConfidenceInput {
            detection_confidence: detection,
            has_price: price_value.is_some(),
            price_value,
            has_amount: net_amount_value.is_some(),
            net_amount_value,
            net_amount_unit,
            gpt_confidence: normalized.confidence,
            brand_norm: normalized.brand_norm.as_deref(),
            product_norm: Some(&product_norm),
            category: Some(&normalized.category),
            container_type: normalized.container_type,
            has_unit_price: unit_price.is_some(),
        });
        let status = status_from_confidence(confidence.overall);

        let crop_url = self.cropper.as_ref().and_then(|cropper| {
            let offer_id = generate_offer_id(
                retailer.unwrap_or("unknown"),
                block.page,
                block.bbox,
                &product_text,
            );
            cropper.crop(pdf_bytes, block.page, block.bbox, &offer_id)
        });

        let candidates = if self.config.learning_mode {
            Some(OfferCandidates {
                price_candidates: page_anchors
                    .iter()
                    .filter(|a| a.line_index >= block.start && a.line_index <= block.end + 2)
                    .map(|a| a.value)
                    .collect(),
                amount_candidates: hygiene::all_quantity_readings(&line_texts),
                selected: quantity.as_ref().map(|q| q.raw.clone()),
            })
        } else {
            None
        };

        let (x0, y0, x1, y1) = block.bbox.corners();

        let offer = Offer {
            product_text_raw: product_text.clone(),
            brand_norm: normalized.brand_norm,
            product_norm: Some(product_norm),
            variant_norm,
            category: normalized.category,
            net_amount_value,
            net_amount_unit,
            pack_count,
            container_type: normalized.container_type,
            price_value,
            deposit_value,
            price_excl_deposit,
            unit_price_value: unit_price.map(|u| u.value),
            unit_price_unit: unit_price.map(|u| u.unit),
            sku_key,
            comment: normalized.comment.or(comment_text),
            confidence: confidence.overall,
            confidence_details: confidence.details,
            confidence_reasons: confidence.reasons,
            status,
            is_duplicate: false,
            first_seen_page: None,
            occurrence: None,
            crop_url,
            trace: OfferTrace {
                page: block.page,
                bbox: [x0, y0, x1, y1],
                text_lines: line_texts.iter().map(|t| t.to_string()).collect(),
                source_file: source_file.map(str::to_string),
            },
            candidates,
        };

        Some(DraftOffer {
            offer,
            product_for_validation: product_text,
        })
    }

    /// Run the product validator and flag within-scan duplicates.
    fn validate_and_dedup(&self, drafts: Vec<DraftOffer>) -> Vec<Offer> {
        let mut seen: HashMap<String, (u32, u32)> = HashMap::new();
        let mut offers = Vec::new();

        for draft in drafts {
            let mut offer = draft.offer;

            if !hygiene::is_valid_product(
                &draft.product_for_validation,
                offer.confidence,
                offer.price_value.is_some(),
            ) {
                log::debug!(
                    "dropping invalid candidate '{}' (page {})",
                    draft.product_for_validation,
                    offer.trace.page
                );
                continue;
            }

            let product_key = offer
                .product_norm
                .as_deref()
                .unwrap_or(&offer.product_text_raw)
                .trim()
                .to_lowercase();
            let key = format!("{}_{:.2}", product_key, offer.price_value.unwrap_or(0.0));

            match seen.get_mut(&key) {
                Some((first_page, count)) => {
                    *count += 1;
                    offer.is_duplicate = true;
                    offer.first_seen_page = Some(*first_page);
                    offer.occurrence = Some(*count);
                }
                None => {
                    seen.insert(key, (offer.trace.page, 1));
                }
            }

            offers.push(offer);
        }

        offers
    }
}

/// Confidence that a clustered block really is an offer.
///
/// Base 0.5, adjusted by the strength of the product text and the presence
/// of price, quantity and unit-price signals.
fn detection_confidence(
    product_text: &str,
    price: Option<f64>,
    has_quantity: bool,
    has_unit_price: bool,
) -> f64 {
    let mut confidence: f64 = 0.5;
    let len = product_text.chars().count();

    if len > 5 {
        confidence += 0.1;
    }
    if len > 15 {
        confidence += 0.1;
    }
    if let Some(p) = price {
        if (5.0..=500.0).contains(&p) {
            confidence += 0.1;
        }
    }
    if has_quantity {
        confidence += 0.1;
    }
    if has_unit_price {
        confidence += 0.15;
    }
    if RE_CAPITALIZED_WORD.is_match(product_text) {
        confidence += 0.05;
    }
    if len < 4 {
        confidence -= 0.2;
    }

    let letters = product_text
        .chars()
        .filter(|c| c.is_alphabetic())
        .count();
    if letters * 2 < len {
        confidence -= 0.1;
    }

    confidence.clamp(0.0, 1.0)
}

/// Concatenated text of the first `page_count` pages.
fn leading_text(pages: &[Page], page_count: usize) -> String {
    pages
        .iter()
        .take(page_count)
        .flat_map(|p| p.lines.iter())
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
