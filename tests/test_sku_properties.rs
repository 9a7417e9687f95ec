//! Property tests for SKU key generation.
//!
//! The key is the cross-flyer identity of a product, so the laws matter
//! more than any single example: generation must be deterministic, parsing
//! must invert generation, and equivalent amounts must collapse to the
//! same base form.

use flyer_scan::sku::{generate_sku_key, normalize_text, parse_sku_key};
use flyer_scan::units::{AmountUnit, Container};
use proptest::prelude::*;

/// Text fragments resembling flyer field content. Strings slugging to the
/// literal `null` placeholder are excluded; they are indistinguishable
/// from an absent field by design.
fn field_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-zÆØÅæøå0-9 \\-']{1,24}")
        .unwrap()
        .prop_filter("placeholder collision", |s| {
            normalize_text(s).as_deref() != Some("null")
        })
}

fn container() -> impl Strategy<Value = Option<Container>> {
    prop_oneof![
        Just(None),
        Just(Some(Container::Can)),
        Just(Some(Container::Bottle)),
        Just(Some(Container::Bag)),
        Just(Some(Container::Tray)),
        Just(Some(Container::Box)),
        Just(Some(Container::Jar)),
        Just(Some(Container::Tube)),
    ]
}

fn base_unit() -> impl Strategy<Value = AmountUnit> {
    prop_oneof![
        Just(AmountUnit::G),
        Just(AmountUnit::Kg),
        Just(AmountUnit::Ml),
        Just(AmountUnit::Cl),
        Just(AmountUnit::Dl),
        Just(AmountUnit::L),
        Just(AmountUnit::Stk),
    ]
}

proptest! {
    #[test]
    fn generation_is_deterministic(
        brand in proptest::option::of(field_text()),
        product in field_text(),
        variant in proptest::option::of(field_text()),
        container in container(),
        value in proptest::option::of(1.0f64..5000.0),
        unit in base_unit(),
    ) {
        let a = generate_sku_key(
            brand.as_deref(),
            Some(&product),
            variant.as_deref(),
            container,
            value,
            Some(unit),
        );
        let b = generate_sku_key(
            brand.as_deref(),
            Some(&product),
            variant.as_deref(),
            container,
            value,
            Some(unit),
        );
        prop_assert_eq!(a, b);
    }

    #[test]
    fn parse_inverts_generate(
        brand in proptest::option::of(field_text()),
        product in field_text(),
        variant in proptest::option::of(field_text()),
        container in container(),
        value in 1.0f64..5000.0,
        unit in base_unit(),
    ) {
        let Some(key) = generate_sku_key(
            brand.as_deref(),
            Some(&product),
            variant.as_deref(),
            container,
            Some(value),
            Some(unit),
        ) else {
            // The product slugged to nothing; no key, nothing to invert.
            return Ok(());
        };

        let parts = parse_sku_key(&key).unwrap();
        prop_assert_eq!(parts.brand, brand.as_deref().and_then(normalize_text));
        let normalized_product = normalize_text(&product);
        prop_assert_eq!(parts.product.as_deref(), normalized_product.as_deref());
        prop_assert_eq!(parts.variant, variant.as_deref().and_then(normalize_text));
        prop_assert_eq!(
            parts.container,
            container.map(|c| c.token().to_lowercase())
        );

        let (base_value, base_unit) = unit.to_base(value).unwrap();
        prop_assert_eq!(parts.amount_value, Some(base_value.round() as i64));
        prop_assert_eq!(parts.amount_unit.as_deref(), Some(base_unit.token()));
    }

    #[test]
    fn equivalent_amounts_share_identity(value in 1u32..100) {
        // N litres and N*100 cl are the same package.
        let value = value as f64;
        let litres = generate_sku_key(None, Some("Juice"), None, None, Some(value), Some(AmountUnit::L));
        let cl = generate_sku_key(None, Some("Juice"), None, None, Some(value * 100.0), Some(AmountUnit::Cl));
        prop_assert_eq!(litres, cl);
    }

    #[test]
    fn keys_never_contain_unslugged_characters(
        brand in proptest::option::of(field_text()),
        product in field_text(),
    ) {
        if let Some(key) = generate_sku_key(brand.as_deref(), Some(&product), None, None, None, None) {
            prop_assert!(key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '|'));
            prop_assert_eq!(key.split('|').count(), 5);
        }
    }
}
