//! Deterministic SKU keys: the identity string that matches the same
//! product across weekly flyers.
//!
//! Format: `{brand}|{product}|{variant}|{container}|{amount}` with every
//! text field transliterated and slugged, amounts normalized to base units
//! (ml / g / stk), and `null` placeholders for missing fields. The pack
//! count is deliberately excluded so a 6-pack and a single of the same
//! product share an identity.

use lazy_static::lazy_static;
use regex::Regex;

use crate::units::{AmountUnit, Container};

lazy_static! {
    static ref RE_NON_SLUG: Regex = Regex::new(r"[^a-z0-9\-\s]").unwrap();
    static ref RE_SPACES: Regex = Regex::new(r"\s+").unwrap();
    static ref RE_MULTI_HYPHEN: Regex = Regex::new(r"-+").unwrap();
    static ref RE_AMOUNT: Regex = Regex::new(r"^(\d+)([a-z]+)$").unwrap();
}

/// Slug a text field for use in a SKU key.
///
/// Lowercases, transliterates æ/ø/å, strips everything but alphanumerics,
/// hyphens and spaces, then collapses spaces and repeated hyphens.
pub fn normalize_text(text: &str) -> Option<String> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let transliterated = lowered
        .replace('æ', "ae")
        .replace('ø', "oe")
        .replace('å', "aa");

    let stripped = RE_NON_SLUG.replace_all(&transliterated, "");
    let hyphenated = RE_SPACES.replace_all(stripped.trim(), "-");
    let collapsed = RE_MULTI_HYPHEN.replace_all(&hyphenated, "-");
    let result = collapsed.trim_matches('-').to_string();

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Format an amount as `{value}{unit}` in base units, or `null`.
pub fn format_amount(value: Option<f64>, unit: Option<AmountUnit>) -> String {
    let (value, unit) = match (value, unit) {
        (Some(v), Some(u)) => (v, u),
        _ => return "null".to_string(),
    };

    match unit.to_base(value) {
        Some((base_value, base_unit)) => {
            format!("{}{}", base_value.round() as i64, base_unit.token())
        }
        // Unrecognized units have no base form and no identity value.
        None => "null".to_string(),
    }
}

/// Generate the SKU key. The product name is required; everything else
/// degrades to `null`.
pub fn generate_sku_key(
    brand: Option<&str>,
    product: Option<&str>,
    variant: Option<&str>,
    container: Option<Container>,
    net_amount_value: Option<f64>,
    net_amount_unit: Option<AmountUnit>,
) -> Option<String> {
    let product = normalize_text(product?)?;

    let parts = [
        brand.and_then(normalize_text).unwrap_or_else(|| "null".to_string()),
        product,
        variant.and_then(normalize_text).unwrap_or_else(|| "null".to_string()),
        container
            .map(|c| c.token().to_lowercase())
            .unwrap_or_else(|| "null".to_string()),
        format_amount(net_amount_value, net_amount_unit),
    ];

    Some(parts.join("|"))
}

/// The components parsed back out of a SKU key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkuParts {
    /// Slugged brand
    pub brand: Option<String>,
    /// Slugged product
    pub product: Option<String>,
    /// Slugged variant
    pub variant: Option<String>,
    /// Container token (lowercase)
    pub container: Option<String>,
    /// Amount value in base units
    pub amount_value: Option<i64>,
    /// Base unit token
    pub amount_unit: Option<String>,
}

/// Parse a SKU key back into its components. Keys with the wrong number of
/// segments yield `None`.
pub fn parse_sku_key(sku_key: &str) -> Option<SkuParts> {
    let parts: Vec<&str> = sku_key.split('|').collect();
    if parts.len() != 5 {
        return None;
    }

    let field = |s: &str| {
        if s == "null" {
            None
        } else {
            Some(s.to_string())
        }
    };

    let mut result = SkuParts {
        brand: field(parts[0]),
        product: field(parts[1]),
        variant: field(parts[2]),
        container: field(parts[3]),
        ..Default::default()
    };

    if parts[4] != "null" {
        if let Some(caps) = RE_AMOUNT.captures(parts[4]) {
            result.amount_value = caps[1].parse().ok();
            result.amount_unit = Some(caps[2].to_string());
        }
    }

    Some(result)
}

/// Do two keys identify the same product?
pub fn sku_keys_match(key1: Option<&str>, key2: Option<&str>) -> bool {
    match (key1, key2) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_basic_key() {
        let key = generate_sku_key(
            Some("Coca-Cola"),
            Some("Cola"),
            Some("Original"),
            Some(Container::Can),
            Some(330.0),
            Some(AmountUnit::Ml),
        );
        assert_eq!(key.as_deref(), Some("coca-cola|cola|original|can|330ml"));
    }

    #[test]
    fn test_danish_transliteration() {
        let key = generate_sku_key(
            Some("Arla"),
            Some("Letmælk"),
            Some("Økologisk"),
            Some(Container::Bottle),
            Some(1.0),
            Some(AmountUnit::L),
        );
        assert_eq!(key.as_deref(), Some("arla|letmaelk|oekologisk|bottle|1000ml"));
    }

    #[test]
    fn test_missing_fields_become_null() {
        let key = generate_sku_key(
            None,
            Some("Hakket oksekød"),
            Some("8-12% fedt"),
            Some(Container::Tray),
            Some(500.0),
            Some(AmountUnit::G),
        );
        assert_eq!(key.as_deref(), Some("null|hakket-oksekoed|8-12-fedt|tray|500g"));
    }

    #[test]
    fn test_product_is_required() {
        assert_eq!(
            generate_sku_key(Some("Arla"), None, None, None, None, None),
            None
        );
        assert_eq!(
            generate_sku_key(Some("Arla"), Some("   "), None, None, None, None),
            None
        );
    }

    #[test]
    fn test_kg_normalizes_to_grams() {
        let key =
            generate_sku_key(None, Some("Mel"), None, None, Some(2.0), Some(AmountUnit::Kg));
        assert_eq!(key.as_deref(), Some("null|mel|null|null|2000g"));
    }

    #[test]
    fn test_unknown_unit_amount_is_null() {
        let key = generate_sku_key(
            None,
            Some("Vare"),
            None,
            None,
            Some(12.0),
            Some(AmountUnit::Unknown),
        );
        assert_eq!(key.as_deref(), Some("null|vare|null|null|null"));
    }

    #[test]
    fn test_parse_round_trip() {
        let key = generate_sku_key(
            Some("Tuborg"),
            Some("Øl"),
            Some("Classic"),
            Some(Container::Can),
            Some(33.0),
            Some(AmountUnit::Cl),
        )
        .unwrap();
        let parts = parse_sku_key(&key).unwrap();
        assert_eq!(parts.brand.as_deref(), Some("tuborg"));
        assert_eq!(parts.product.as_deref(), Some("oel"));
        assert_eq!(parts.variant.as_deref(), Some("classic"));
        assert_eq!(parts.container.as_deref(), Some("can"));
        assert_eq!(parts.amount_value, Some(330));
        assert_eq!(parts.amount_unit.as_deref(), Some("ml"));
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_eq!(parse_sku_key("a|b|c"), None);
        let parts = parse_sku_key("null|produkt|null|null|null").unwrap();
        assert_eq!(parts.brand, None);
        assert_eq!(parts.amount_value, None);
    }

    #[test]
    fn test_keys_match_case_insensitively() {
        assert!(sku_keys_match(
            Some("arla|letmaelk|null|null|1000ml"),
            Some("Arla|Letmaelk|null|null|1000ml")
        ));
        assert!(!sku_keys_match(Some("a|b|c|d|e"), None));
    }
}
