//! Confidence scoring: deciding whether an offer can be auto-published.
//!
//! Five weighted factors (price 0.35, detection 0.25, normalization 0.20,
//! amount 0.15, completeness 0.05) produce the overall score, followed by
//! hard caps for the critical gaps: no price caps the score at 0.3, no
//! product name at 0.5. Reasons are collected in Danish for the review UI.
//!
//! Thresholds: 0.9 and above publishes automatically; 0.5 and above goes
//! to review; anything below is low confidence.

use serde::{Deserialize, Serialize};

use crate::units::{round2, AmountUnit, Container};

/// Factor weights; they sum to 1.0.
pub const WEIGHT_PRICE: f64 = 0.35;
/// Block-detection factor weight.
pub const WEIGHT_DETECTION: f64 = 0.25;
/// Normalization factor weight.
pub const WEIGHT_GPT: f64 = 0.20;
/// Amount factor weight.
pub const WEIGHT_AMOUNT: f64 = 0.15;
/// Completeness factor weight.
pub const WEIGHT_COMPLETENESS: f64 = 0.05;

/// Publication status derived from the overall confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Auto-publishable (confidence at least 0.9)
    Published,
    /// Needs human review (confidence at least 0.5)
    NeedsReview,
    /// Too weak to surface (below 0.5)
    LowConfidence,
}

/// Per-factor scores, serialized into each offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDetails {
    /// Price factor
    pub price: f64,
    /// Block-detection factor
    pub detection: f64,
    /// Normalization factor
    pub gpt: f64,
    /// Amount factor
    pub amount: f64,
    /// Completeness factor
    pub completeness: f64,
}

/// Signals feeding the confidence calculation.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceInput<'a> {
    /// Block-detector confidence
    pub detection_confidence: f64,
    /// Was a price anchor attached?
    pub has_price: bool,
    /// The attached price, if any
    pub price_value: Option<f64>,
    /// Was an amount found?
    pub has_amount: bool,
    /// Amount value
    pub net_amount_value: Option<f64>,
    /// Amount unit
    pub net_amount_unit: Option<AmountUnit>,
    /// The normalizer's own confidence stamp
    pub gpt_confidence: f64,
    /// Normalized brand
    pub brand_norm: Option<&'a str>,
    /// Normalized product name
    pub product_norm: Option<&'a str>,
    /// Assigned category
    pub category: Option<&'a str>,
    /// Detected container
    pub container_type: Option<Container>,
    /// Was a unit price computed?
    pub has_unit_price: bool,
}

/// Result of confidence calculation.
#[derive(Debug, Clone)]
pub struct ConfidenceResult {
    /// Weighted, capped overall score, rounded to two decimals
    pub overall: f64,
    /// Per-factor scores
    pub details: ConfidenceDetails,
    /// Human-readable reasons for deductions
    pub reasons: Vec<String>,
}

impl ConfidenceResult {
    /// Can this offer be published without review?
    pub fn can_auto_publish(&self) -> bool {
        self.overall >= 0.9
    }
}

/// Map an overall confidence to a status.
pub fn status_from_confidence(confidence: f64) -> OfferStatus {
    if confidence >= 0.9 {
        OfferStatus::Published
    } else if confidence >= 0.5 {
        OfferStatus::NeedsReview
    } else {
        OfferStatus::LowConfidence
    }
}

/// Calculate the overall confidence from the input signals.
pub fn calculate_confidence(input: &ConfidenceInput) -> ConfidenceResult {
    let mut reasons: Vec<String> = Vec::new();

    // 1. Price factor: extreme prices are suspicious, missing is fatal.
    let price = match input.price_value.filter(|_| input.has_price) {
        Some(p) if p > 0.0 => {
            if p < 1.0 {
                reasons.push("Mistænkelig lav pris (<1 kr)".to_string());
                0.7
            } else if p > 5000.0 {
                reasons.push("Mistænkelig høj pris (>5000 kr)".to_string());
                0.6
            } else {
                1.0
            }
        }
        _ => {
            reasons.push("Ingen pris fundet".to_string());
            0.0
        }
    };

    // 2. Detection factor: passed through from the block detector.
    let detection = input.detection_confidence.clamp(0.0, 1.0);
    if detection < 0.5 {
        reasons.push("Lav blok-detektions confidence".to_string());
    }

    // 3. Normalization factor.
    let mut gpt = input.gpt_confidence.clamp(0.0, 1.0);
    if input
        .product_norm
        .is_some_and(|p| p.chars().count() >= 3)
    {
        gpt = gpt.max(0.6);
    }
    if input.brand_norm.is_some() {
        gpt = (gpt + 0.1).min(1.0);
    }
    if input.category.is_some_and(|c| c != "Andet") {
        gpt = (gpt + 0.05).min(1.0);
    }
    if gpt < 0.5 {
        reasons.push("Lav normaliserings-confidence".to_string());
    }

    // 4. Amount factor.
    let amount = match (
        input.has_amount,
        input.net_amount_value,
        input.net_amount_unit,
    ) {
        (true, Some(value), Some(unit)) => {
            if value <= 0.0 {
                reasons.push("Ugyldig mængde-værdi".to_string());
                0.3
            } else if unit == AmountUnit::Unknown {
                reasons.push("Ukendt mængde-enhed".to_string());
                0.7
            } else {
                1.0
            }
        }
        _ => {
            reasons.push("Ingen mængde fundet".to_string());
            0.5
        }
    };

    // 5. Completeness factor: fraction of the core fields present.
    let completeness_fields = [
        input.has_price,
        input.product_norm.is_some(),
        input.has_amount,
        input.container_type.is_some(),
        input.has_unit_price,
    ];
    let completeness = completeness_fields.iter().filter(|f| **f).count() as f64
        / completeness_fields.len() as f64;

    let mut overall = round2(
        price * WEIGHT_PRICE
            + detection * WEIGHT_DETECTION
            + gpt * WEIGHT_GPT
            + amount * WEIGHT_AMOUNT
            + completeness * WEIGHT_COMPLETENESS,
    );

    // Hard caps for the critical gaps.
    if !input.has_price {
        overall = overall.min(0.3);
    }
    if input.product_norm.is_none() {
        overall = overall.min(0.5);
    }

    if reasons.is_empty() {
        reasons.push("Alle felter OK".to_string());
    }

    ConfidenceResult {
        overall,
        details: ConfidenceDetails {
            price,
            detection,
            gpt,
            amount,
            completeness,
        },
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> ConfidenceInput<'static> {
        ConfidenceInput {
            detection_confidence: 0.95,
            has_price: true,
            price_value: Some(29.95),
            has_amount: true,
            net_amount_value: Some(500.0),
            net_amount_unit: Some(AmountUnit::G),
            gpt_confidence: 0.9,
            brand_norm: Some("Arla"),
            product_norm: Some("Letmælk"),
            category: Some("Mejeri"),
            container_type: Some(Container::Bottle),
            has_unit_price: true,
        }
    }

    #[test]
    fn test_complete_offer_publishes() {
        let result = calculate_confidence(&complete_input());
        assert!(result.overall >= 0.9);
        assert!(result.can_auto_publish());
        assert_eq!(status_from_confidence(result.overall), OfferStatus::Published);
        assert_eq!(result.reasons, vec!["Alle felter OK".to_string()]);
    }

    #[test]
    fn test_price_factor_boundaries() {
        let mut input = complete_input();

        input.price_value = Some(0.99);
        assert_eq!(calculate_confidence(&input).details.price, 0.7);

        input.price_value = Some(1.0);
        assert_eq!(calculate_confidence(&input).details.price, 1.0);

        input.price_value = Some(5000.0);
        assert_eq!(calculate_confidence(&input).details.price, 1.0);

        input.price_value = Some(5000.01);
        assert_eq!(calculate_confidence(&input).details.price, 0.6);
    }

    #[test]
    fn test_missing_price_caps_overall() {
        let mut input = complete_input();
        input.has_price = false;
        input.price_value = None;
        let result = calculate_confidence(&input);
        assert!(result.overall <= 0.3);
        assert!(result.reasons.iter().any(|r| r.contains("Ingen pris")));
    }

    #[test]
    fn test_missing_product_caps_overall() {
        let mut input = complete_input();
        input.product_norm = None;
        let result = calculate_confidence(&input);
        assert!(result.overall <= 0.5);
    }

    #[test]
    fn test_gpt_factor_bonuses() {
        let mut input = complete_input();
        input.gpt_confidence = 0.5;
        input.brand_norm = None;
        input.category = Some("Andet");
        // Floor at 0.6 for a non-trivial product name.
        assert_eq!(calculate_confidence(&input).details.gpt, 0.6);

        input.brand_norm = Some("Arla");
        assert!((calculate_confidence(&input).details.gpt - 0.7).abs() < 1e-9);

        input.category = Some("Mejeri");
        assert!((calculate_confidence(&input).details.gpt - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_amount_factor_variants() {
        let mut input = complete_input();

        input.net_amount_unit = Some(AmountUnit::Unknown);
        assert_eq!(calculate_confidence(&input).details.amount, 0.7);

        input.net_amount_unit = Some(AmountUnit::G);
        input.net_amount_value = Some(0.0);
        assert_eq!(calculate_confidence(&input).details.amount, 0.3);

        input.has_amount = false;
        input.net_amount_value = None;
        input.net_amount_unit = None;
        assert_eq!(calculate_confidence(&input).details.amount, 0.5);
    }

    #[test]
    fn test_completeness_fraction() {
        let input = ConfidenceInput {
            detection_confidence: 0.8,
            has_price: true,
            price_value: Some(15.0),
            product_norm: Some("Rugbrød"),
            gpt_confidence: 0.6,
            ..Default::default()
        };
        let result = calculate_confidence(&input);
        // price + product present out of five fields.
        assert!((result.details.completeness - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(status_from_confidence(0.9), OfferStatus::Published);
        assert_eq!(status_from_confidence(0.89), OfferStatus::NeedsReview);
        assert_eq!(status_from_confidence(0.5), OfferStatus::NeedsReview);
        assert_eq!(status_from_confidence(0.49), OfferStatus::LowConfidence);
    }
}
