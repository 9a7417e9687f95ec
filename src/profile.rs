//! Retailer profiles: the bundle of thresholds and price-detection rules
//! that differ between supermarket chains.
//!
//! Adding a retailer means adding a profile here (and, when needed, a
//! pattern family in [`crate::hygiene`]); the pipeline itself is shared.

/// How a chain typesets its prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStyle {
    /// Two-part prices: a large kroner glyph followed on the same line by a
    /// `.-` marker (whole kroner) or a smaller two-digit øre glyph.
    /// Used by the Netto family.
    TwoPart,
    /// Single-span prices at large size: `49,-`, `49.95` or `49,−`,
    /// in addition to the two-part form. Used by the Rema family.
    DashSuffix,
}

/// Pattern family selecting the retailer-tuned hygiene set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    /// Baseline set shared by the Salling-group chains
    Netto,
    /// Baseline set plus Rema slogans, recipe bullets and app prompts
    Rema,
}

/// Per-chain extraction parameters.
#[derive(Debug, Clone)]
pub struct RetailerProfile {
    /// Profile id (lowercase retailer id this profile serves)
    pub id: &'static str,
    /// Minimum font size for a kroner glyph, in points
    pub large_font_pt: f32,
    /// Font range `[lo, hi)` for the two-digit øre glyph, in points
    pub ore_font_pt: (f32, f32),
    /// Column change threshold for block splitting, in points
    pub column_tolerance_pt: f32,
    /// Price typesetting variant
    pub price_style: PriceStyle,
    /// Which hygiene pattern family applies
    pub patterns: PatternFamily,
}

/// Profile for the Netto family (also the default for unknown chains).
pub const NETTO: RetailerProfile = RetailerProfile {
    id: "netto",
    large_font_pt: 50.0,
    ore_font_pt: (20.0, 50.0),
    column_tolerance_pt: 50.0,
    price_style: PriceStyle::TwoPart,
    patterns: PatternFamily::Netto,
};

/// Profile for the Rema family.
pub const REMA: RetailerProfile = RetailerProfile {
    id: "rema",
    large_font_pt: 50.0,
    ore_font_pt: (20.0, 50.0),
    column_tolerance_pt: 50.0,
    price_style: PriceStyle::DashSuffix,
    patterns: PatternFamily::Rema,
};

impl RetailerProfile {
    /// Select the profile for a detected retailer id.
    ///
    /// Unknown and undetected retailers fall back to the Netto profile,
    /// whose rules are the least chain-specific.
    pub fn for_retailer(retailer: Option<&str>) -> &'static RetailerProfile {
        match retailer {
            Some("rema") => &REMA,
            _ => &NETTO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rema_gets_dash_suffix_style() {
        let profile = RetailerProfile::for_retailer(Some("rema"));
        assert_eq!(profile.price_style, PriceStyle::DashSuffix);
        assert_eq!(profile.patterns, PatternFamily::Rema);
    }

    #[test]
    fn test_unknown_retailer_defaults_to_netto() {
        assert_eq!(RetailerProfile::for_retailer(None).id, "netto");
        assert_eq!(RetailerProfile::for_retailer(Some("bilka")).id, "netto");
        assert_eq!(
            RetailerProfile::for_retailer(Some("netto")).price_style,
            PriceStyle::TwoPart
        );
    }
}
