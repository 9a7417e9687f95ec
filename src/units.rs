//! Amount units, containers, unit prices and deposits.
//!
//! Every arithmetic path (unit price, SKU amounts, deposit estimation)
//! switches exhaustively on [`AmountUnit`], so an unrecognized unit is a
//! variant the compiler forces each caller to address rather than a string
//! that silently flows through.

use serde::{Deserialize, Serialize};

/// Round to two decimals, the resolution of every monetary value emitted.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A package amount unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountUnit {
    /// Grams
    G,
    /// Kilograms
    Kg,
    /// Millilitres
    Ml,
    /// Centilitres
    Cl,
    /// Decilitres
    Dl,
    /// Litres
    L,
    /// Pieces
    Stk,
    /// Packs
    Pk,
    /// Present in the source but not one of the known units
    Unknown,
}

impl AmountUnit {
    /// Parse a unit token, mapping the common Danish synonyms.
    ///
    /// Returns `None` for an empty token and [`AmountUnit::Unknown`] for a
    /// token that is present but unrecognized.
    pub fn parse(token: &str) -> Option<AmountUnit> {
        let token = token.trim().trim_end_matches('.').to_lowercase();
        if token.is_empty() {
            return None;
        }
        Some(match token.as_str() {
            "g" | "gram" => AmountUnit::G,
            "kg" | "kilo" | "kilogram" => AmountUnit::Kg,
            "ml" | "milliliter" => AmountUnit::Ml,
            "cl" | "centiliter" => AmountUnit::Cl,
            "dl" | "deciliter" => AmountUnit::Dl,
            "l" | "liter" => AmountUnit::L,
            "stk" | "styk" | "stykker" => AmountUnit::Stk,
            "pk" | "pak" | "pakke" => AmountUnit::Pk,
            _ => AmountUnit::Unknown,
        })
    }

    /// The token used in serialized offers and SKU keys.
    pub fn token(&self) -> &'static str {
        match self {
            AmountUnit::G => "g",
            AmountUnit::Kg => "kg",
            AmountUnit::Ml => "ml",
            AmountUnit::Cl => "cl",
            AmountUnit::Dl => "dl",
            AmountUnit::L => "l",
            AmountUnit::Stk => "stk",
            AmountUnit::Pk => "pk",
            AmountUnit::Unknown => "?",
        }
    }

    /// Normalize an amount to base units: ml for volume, g for weight,
    /// stk for counts. Unknown units have no base form.
    pub fn to_base(&self, value: f64) -> Option<(f64, AmountUnit)> {
        match self {
            AmountUnit::Ml => Some((value, AmountUnit::Ml)),
            AmountUnit::Cl => Some((value * 10.0, AmountUnit::Ml)),
            AmountUnit::Dl => Some((value * 100.0, AmountUnit::Ml)),
            AmountUnit::L => Some((value * 1000.0, AmountUnit::Ml)),
            AmountUnit::G => Some((value, AmountUnit::G)),
            AmountUnit::Kg => Some((value * 1000.0, AmountUnit::G)),
            AmountUnit::Stk | AmountUnit::Pk => Some((value, AmountUnit::Stk)),
            AmountUnit::Unknown => None,
        }
    }
}

/// Container type of a packaged product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Container {
    /// Dåse
    Can,
    /// Flaske
    Bottle,
    /// Pose
    Bag,
    /// Bakke
    Tray,
    /// Æske/karton
    Box,
    /// Glas
    Jar,
    /// Tube
    Tube,
}

impl Container {
    /// Parse a container token as the normalizer emits it (upper-case,
    /// with NONE meaning absent).
    pub fn parse(token: &str) -> Option<Container> {
        match token.trim().to_uppercase().as_str() {
            "CAN" => Some(Container::Can),
            "BOTTLE" => Some(Container::Bottle),
            "BAG" => Some(Container::Bag),
            "TRAY" => Some(Container::Tray),
            "BOX" => Some(Container::Box),
            "JAR" => Some(Container::Jar),
            "TUBE" => Some(Container::Tube),
            _ => None,
        }
    }

    /// The token used in serialized offers and SKU keys.
    pub fn token(&self) -> &'static str {
        match self {
            Container::Can => "CAN",
            Container::Bottle => "BOTTLE",
            Container::Bag => "BAG",
            Container::Tray => "TRAY",
            Container::Box => "BOX",
            Container::Jar => "JAR",
            Container::Tube => "TUBE",
        }
    }

    /// Detect a container from Danish product text.
    pub fn detect(text: &str) -> Option<Container> {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if has(&["dåse", "dåser"]) {
            Some(Container::Can)
        } else if has(&["flaske", "flasker", "pet"]) {
            Some(Container::Bottle)
        } else if has(&["pose", "poser"]) {
            Some(Container::Bag)
        } else if has(&["bakke", "bakker"]) {
            Some(Container::Tray)
        } else if has(&["æske", "karton"]) {
            Some(Container::Box)
        } else if has(&["glas", "syltetøj"]) {
            Some(Container::Jar)
        } else if has(&["tube"]) {
            Some(Container::Tube)
        } else {
            None
        }
    }
}

/// Unit of a computed per-unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitPriceUnit {
    /// Kroner per litre
    #[serde(rename = "kr/L")]
    KrPerLitre,
    /// Kroner per kilogram
    #[serde(rename = "kr/kg")]
    KrPerKg,
    /// Kroner per piece
    #[serde(rename = "kr/stk")]
    KrPerPiece,
}

/// A computed per-unit price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPrice {
    /// Price per base unit, rounded to two decimals
    pub value: f64,
    /// Base unit of the price
    pub unit: UnitPriceUnit,
}

/// Calculate the deterministic per-unit price of an offer.
///
/// The deposit is subtracted first; a deposit that would wipe out the
/// price is treated as bogus and ignored. The pack count multiplies the
/// per-item amount.
pub fn calculate_unit_price(
    price_value: Option<f64>,
    deposit_value: Option<f64>,
    net_amount_value: Option<f64>,
    net_amount_unit: Option<AmountUnit>,
    pack_count: Option<u32>,
) -> Option<UnitPrice> {
    let price = price_value.filter(|p| *p > 0.0)?;
    let amount = net_amount_value.filter(|v| *v > 0.0)?;
    let unit = net_amount_unit?;

    let mut effective_price = price - deposit_value.unwrap_or(0.0);
    if effective_price <= 0.0 {
        effective_price = price;
    }

    let total_amount = amount * pack_count.unwrap_or(1) as f64;

    let (value, unit) = match unit {
        AmountUnit::Ml => (effective_price / (total_amount / 1000.0), UnitPriceUnit::KrPerLitre),
        AmountUnit::Cl => (effective_price / (total_amount / 100.0), UnitPriceUnit::KrPerLitre),
        AmountUnit::Dl => (effective_price / (total_amount / 10.0), UnitPriceUnit::KrPerLitre),
        AmountUnit::L => (effective_price / total_amount, UnitPriceUnit::KrPerLitre),
        AmountUnit::G => (effective_price / (total_amount / 1000.0), UnitPriceUnit::KrPerKg),
        AmountUnit::Kg => (effective_price / total_amount, UnitPriceUnit::KrPerKg),
        AmountUnit::Stk | AmountUnit::Pk => {
            (effective_price / total_amount, UnitPriceUnit::KrPerPiece)
        }
        AmountUnit::Unknown => return None,
    };

    Some(UnitPrice {
        value: round2(value),
        unit,
    })
}

/// Price with the deposit removed, clamped back to the full price when the
/// deposit is absent, non-positive, or larger than the price itself.
pub fn calculate_price_excl_deposit(
    price_value: Option<f64>,
    deposit_value: Option<f64>,
) -> Option<f64> {
    let price = price_value?;
    match deposit_value {
        Some(d) if d > 0.0 => {
            let result = price - d;
            if result > 0.0 {
                Some(round2(result))
            } else {
                Some(price)
            }
        }
        _ => Some(price),
    }
}

/// Estimate the Danish container deposit (pant) for the whole pack.
///
/// Rates: cans and small bottles carry A-pant (1.00 kr); bottles of a litre
/// or more carry C-pant (3.00 kr). Containers other than cans and bottles
/// carry none.
pub fn estimate_deposit(
    container: Option<Container>,
    net_amount_value: Option<f64>,
    net_amount_unit: Option<AmountUnit>,
    pack_count: Option<u32>,
) -> Option<f64> {
    let per_item = match container? {
        Container::Can => 1.0,
        Container::Bottle => {
            let ml = match (net_amount_value, net_amount_unit) {
                (Some(v), Some(u)) => match u.to_base(v) {
                    Some((base, AmountUnit::Ml)) => base,
                    _ => 0.0,
                },
                _ => 0.0,
            };
            if ml >= 1000.0 {
                3.0
            } else {
                1.0
            }
        }
        _ => return None,
    };

    Some(round2(per_item * pack_count.unwrap_or(1) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parse_synonyms() {
        assert_eq!(AmountUnit::parse("gram"), Some(AmountUnit::G));
        assert_eq!(AmountUnit::parse("Liter"), Some(AmountUnit::L));
        assert_eq!(AmountUnit::parse("kilo"), Some(AmountUnit::Kg));
        assert_eq!(AmountUnit::parse("styk"), Some(AmountUnit::Stk));
        assert_eq!(AmountUnit::parse("stk."), Some(AmountUnit::Stk));
        assert_eq!(AmountUnit::parse(""), None);
        assert_eq!(AmountUnit::parse("oz"), Some(AmountUnit::Unknown));
    }

    #[test]
    fn test_unit_price_volume() {
        // 6 x 33 cl at 45 kr minus 6 kr deposit -> 19.70 kr/L
        let up = calculate_unit_price(
            Some(45.0),
            Some(6.0),
            Some(33.0),
            Some(AmountUnit::Cl),
            Some(6),
        )
        .unwrap();
        assert_eq!(up.unit, UnitPriceUnit::KrPerLitre);
        assert!((up.value - 19.7).abs() < 1e-9);
    }

    #[test]
    fn test_unit_price_agrees_across_equivalent_units() {
        // 500 g and 0.5 kg at the same price must give identical kr/kg.
        let g = calculate_unit_price(Some(25.0), None, Some(500.0), Some(AmountUnit::G), None)
            .unwrap();
        let kg = calculate_unit_price(Some(25.0), None, Some(0.5), Some(AmountUnit::Kg), None)
            .unwrap();
        assert_eq!(g.unit, UnitPriceUnit::KrPerKg);
        assert_eq!(g.value, kg.value);
        assert_eq!(g.value, 50.0);
    }

    #[test]
    fn test_unit_price_pieces() {
        let up = calculate_unit_price(Some(30.0), None, Some(1.0), Some(AmountUnit::Stk), Some(3));
        assert_eq!(up.unwrap().value, 10.0);
    }

    #[test]
    fn test_unit_price_missing_inputs() {
        assert!(calculate_unit_price(None, None, Some(500.0), Some(AmountUnit::G), None).is_none());
        assert!(calculate_unit_price(Some(25.0), None, None, Some(AmountUnit::G), None).is_none());
        assert!(calculate_unit_price(Some(25.0), None, Some(500.0), None, None).is_none());
        assert!(calculate_unit_price(
            Some(25.0),
            None,
            Some(500.0),
            Some(AmountUnit::Unknown),
            None
        )
        .is_none());
    }

    #[test]
    fn test_bogus_deposit_is_ignored() {
        // Deposit exceeding the price falls back to the full price.
        let up =
            calculate_unit_price(Some(2.0), Some(3.0), Some(1.0), Some(AmountUnit::L), None)
                .unwrap();
        assert_eq!(up.value, 2.0);
    }

    #[test]
    fn test_price_excl_deposit() {
        assert_eq!(calculate_price_excl_deposit(Some(45.0), Some(6.0)), Some(39.0));
        assert_eq!(calculate_price_excl_deposit(Some(45.0), None), Some(45.0));
        assert_eq!(calculate_price_excl_deposit(Some(2.0), Some(3.0)), Some(2.0));
        assert_eq!(calculate_price_excl_deposit(None, Some(3.0)), None);
    }

    #[test]
    fn test_deposit_estimate() {
        // Cans always carry A-pant.
        assert_eq!(
            estimate_deposit(Some(Container::Can), Some(330.0), Some(AmountUnit::Ml), Some(6)),
            Some(6.0)
        );
        // Large bottles carry C-pant.
        assert_eq!(
            estimate_deposit(Some(Container::Bottle), Some(1.5), Some(AmountUnit::L), None),
            Some(3.0)
        );
        // Small bottles carry A-pant.
        assert_eq!(
            estimate_deposit(Some(Container::Bottle), Some(33.0), Some(AmountUnit::Cl), None),
            Some(1.0)
        );
        // Trays carry none.
        assert_eq!(
            estimate_deposit(Some(Container::Tray), Some(500.0), Some(AmountUnit::G), None),
            None
        );
        assert_eq!(estimate_deposit(None, None, None, None), None);
    }

    #[test]
    fn test_container_detection() {
        assert_eq!(Container::detect("Tuborg 6 dåser"), Some(Container::Can));
        assert_eq!(Container::detect("Cola 1,5 L flaske"), Some(Container::Bottle));
        assert_eq!(Container::detect("Chips i pose"), Some(Container::Bag));
        assert_eq!(Container::detect("Hakket oksekød"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(19.6999999), 19.7);
        assert_eq!(round2(3.14159), 3.14);
    }
}
