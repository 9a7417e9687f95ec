//! Deterministic rule-based normalization.
//!
//! The fallback provider when no backend is configured, the call fails, or
//! the reply is invalid. Much weaker than the model (confidence 0.5), but
//! it never fails: brand by first capitalized word, amount and pack count
//! by regex, container and category by keyword.

use lazy_static::lazy_static;
use regex::Regex;

use crate::categories::CachedCategories;
use crate::units::{AmountUnit, Container};

use super::NormalizedProduct;

/// Confidence stamped on rule-based results.
pub const RULES_CONFIDENCE: f64 = 0.5;

lazy_static! {
    /// One or two leading capitalized words.
    static ref RE_BRAND: Regex =
        Regex::new(r"^([A-ZÆØÅ][a-zæøå]+(?:\s+[A-ZÆØÅ][a-zæøå]+)?)").unwrap();
    static ref RE_AMOUNT: Regex =
        Regex::new(r"(\d+(?:[.,]\d+)?)\s*(g|kg|ml|cl|dl|l|liter|stk)\b").unwrap();
    static ref RE_PACK: Regex = Regex::new(r"(\d+)\s*(?:x|-pak|pak|stk)").unwrap();
    static ref RE_COMMENT: Regex =
        Regex::new(r"(max\.?\s*\d+\s*(?:stk|pr|per)[^.]*)").unwrap();
}

/// Adjectives that look like brands but are not.
const BRAND_BLACKLIST: [&str; 5] = ["dansk", "økologisk", "frisk", "god", "lækker"];

/// Plausible pack-count range; anything outside is a quantity, not a pack.
const PACK_RANGE: std::ops::RangeInclusive<u32> = 2..=24;

/// Normalize a product with rules only.
pub fn normalize_with_rules(product_text: &str, categories: &CachedCategories) -> NormalizedProduct {
    let text_lower = product_text.to_lowercase();

    let mut result = NormalizedProduct {
        product_norm: Some(product_text.to_string()),
        confidence: RULES_CONFIDENCE,
        ..Default::default()
    };

    if let Some(caps) = RE_BRAND.captures(product_text) {
        let candidate = caps[1].to_string();
        if !BRAND_BLACKLIST.contains(&candidate.to_lowercase().as_str()) {
            result.brand_norm = Some(candidate);
        }
    }

    if let Some(caps) = RE_AMOUNT.captures(&text_lower) {
        result.net_amount_value = caps[1].replace(',', ".").parse::<f64>().ok();
        result.net_amount_unit = AmountUnit::parse(&caps[2]);
    }

    if let Some(caps) = RE_PACK.captures(&text_lower) {
        if let Ok(count) = caps[1].parse::<u32>() {
            if PACK_RANGE.contains(&count) {
                result.pack_count = Some(count);
            }
        }
    }

    result.container_type = Container::detect(&text_lower);
    result.category = categories.classify(&text_lower);

    if let Some(caps) = RE_COMMENT.captures(&text_lower) {
        result.comment = Some(caps[1].trim().to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> CachedCategories {
        CachedCategories::default()
    }

    #[test]
    fn test_brand_from_capitalized_word() {
        let result = normalize_with_rules("Arla Letmælk 1 l", &categories());
        assert_eq!(result.brand_norm.as_deref(), Some("Arla Letmælk"));
        assert_eq!(result.confidence, RULES_CONFIDENCE);
    }

    #[test]
    fn test_adjectives_are_not_brands() {
        let result = normalize_with_rules("Dansk hakket oksekød 500 g", &categories());
        assert_eq!(result.brand_norm, None);
        assert_eq!(result.net_amount_value, Some(500.0));
        assert_eq!(result.net_amount_unit, Some(AmountUnit::G));
        assert_eq!(result.category, "Kød");
    }

    #[test]
    fn test_pack_count_within_range() {
        let result = normalize_with_rules("Tuborg dåser 6 x 33 cl", &categories());
        assert_eq!(result.pack_count, Some(6));
        assert_eq!(result.container_type, Some(Container::Can));

        // 33 from "33 cl" is over the plausible pack range; 1 is under it.
        let result = normalize_with_rules("Vand 33 x", &categories());
        assert_eq!(result.pack_count, None);
        let result = normalize_with_rules("Mælk 1-pak", &categories());
        assert_eq!(result.pack_count, None);
    }

    #[test]
    fn test_comment_extraction() {
        // The comment stops at the first period, matching "max 3 pr".
        let result = normalize_with_rules("Pringles max 3 pr. kunde", &categories());
        assert_eq!(result.comment.as_deref(), Some("max 3 pr"));

        let result = normalize_with_rules("Haribo max 5 stk pr kunde", &categories());
        assert_eq!(result.comment.as_deref(), Some("max 5 stk pr kunde"));
    }

    #[test]
    fn test_product_norm_is_always_set() {
        let result = normalize_with_rules("xyz", &categories());
        assert_eq!(result.product_norm.as_deref(), Some("xyz"));
        assert_eq!(result.category, "Andet");
    }
}
