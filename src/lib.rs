#![warn(missing_docs)]

//! # Flyer Scan
//!
//! Offer extraction pipeline for Danish supermarket PDF flyers.
//!
//! The pipeline turns raw PDF bytes into a structured catalog of offers:
//! one record per product with a normalized brand/product/variant, a
//! quantity in base units, a price, a deterministic per-unit price, a
//! stable SKU identity key, and a confidence score that decides whether
//! the record auto-publishes or goes to review.
//!
//! ```text
//! PDF bytes
//!     ↓
//! [Layout]      positioned spans with font sizes (pluggable decoder)
//!     ↓
//! [Prices]      font-tier price reconstruction (50pt kroner + ".-"/øre)
//!     ↓
//! [Blocks]      column-x clustering, price-anchored block boundaries
//!     ↓
//! [Hygiene]     skip patterns, name merging, variants, quantities
//!     ↓
//! [Normalize]   LM backend or rule fallback, cached
//!     ↓
//! [Derive]      unit price, deposit, SKU key, confidence, status
//!     ↓
//! [Validate]    product-shape rules, within-scan dedup → ScanResult
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use flyer_scan::{Scanner, Services, ScanConfig};
//!
//! let scanner = Scanner::new(Services::with_defaults(), ScanConfig::default());
//! let result = scanner.scan(&std::fs::read("netto-uge51.pdf")?, Some("netto-uge51.pdf"))?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```
//!
//! External collaborators (the PDF decoder, the language-model normalizer,
//! the category taxonomy, the bbox cropper) enter through the traits in
//! [`layout`], [`normalize`], [`categories`] and [`crop`]; everything else
//! is pure in-process computation.

// Error handling
pub mod error;

// Geometry and layout model
pub mod geometry;
pub mod layout;

// Bundled PDF decoding backend
pub mod pdf;

// Retailer profiles and document-level detection
pub mod profile;
pub mod retailer;
pub mod validity;

// The extraction pipeline
pub mod blocks;
pub mod hygiene;
pub mod prices;

// Normalization and taxonomy
pub mod categories;
pub mod normalize;

// Derivation
pub mod confidence;
pub mod sku;
pub mod units;

// Output model and orchestration
pub mod config;
pub mod crop;
pub mod offer;
pub mod scanner;

/// Scanner version stamped into every result.
///
/// Bump on any change to hygiene patterns, confidence weights, or
/// detection thresholds; downstream diffs key on it.
pub const SCANNER_VERSION: &str = "2.0.0";

pub use config::ScanConfig;
pub use error::{Error, Result};
pub use offer::{Offer, ScanResult};
pub use scanner::{Scanner, Services};
