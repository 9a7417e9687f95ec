//! Price location: reconstructing full prices from font-size tiers.
//!
//! Flyer prices are typeset with the kroner part at a visibly larger size
//! than any surrounding body text, followed on the same line by a `.-`
//! marker or a smaller two-digit øre glyph. Thresholding on the font tier
//! rejects body-text digits that merely look like prices.
//!
//! The locator is the pipeline's only stateful sub-component: a one-slot
//! register holding the most recent large kroner glyph. The register is
//! `(kroner, line, x)`; it is overwritten by a newer kroner span without
//! emitting, and discarded when the line ends; a lone kroner glyph never
//! becomes a price by itself.

use lazy_static::lazy_static;
use regex::Regex;

use crate::layout::Page;
use crate::profile::{PriceStyle, RetailerProfile};

lazy_static! {
    /// Rema single-span whole-kroner form: "49,-", "49.-", "49,−"
    static ref RE_DASH_PRICE: Regex = Regex::new(r"^(\d{1,3})\s*[.,]\s*[-−]$").unwrap();

    /// Rema single-span decimal form: "49,95" or "49.95"
    static ref RE_DECIMAL_PRICE: Regex = Regex::new(r"^(\d{1,3})[.,](\d{2})$").unwrap();
}

/// How a price anchor was reconstructed from the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrigin {
    /// Large kroner digits completed by a same-line marker or øre glyph
    LargeFontNumeric,
    /// A single large span already carrying the decimals ("49,95")
    DecimalLiteral,
    /// A single large span in the dash-suffix form ("49,-")
    TextualDashForm,
}

/// A reconstructed monetary value tied to a layout position.
#[derive(Debug, Clone)]
pub struct PriceAnchor {
    /// Price in kroner
    pub value: f64,
    /// 1-based page number
    pub page: u32,
    /// Index of the source line on its page
    pub line_index: usize,
    /// Left edge of the kroner glyph, in points
    pub x: f32,
    /// Which typeset form produced the anchor
    pub origin: PriceOrigin,
}

/// Completion markers that turn a registered kroner glyph into a whole price.
const WHOLE_KRONER_MARKERS: [&str; 4] = [".-", "-", ".", ",-"];

/// Walk the page's spans in layout order and emit price anchors.
pub fn locate_prices(page: &Page, profile: &RetailerProfile) -> Vec<PriceAnchor> {
    let mut anchors = Vec::new();

    // The awaiting-decimal register: (kroner, line, x).
    let mut register: Option<(u32, usize, f32)> = None;

    for span in &page.spans {
        let trimmed = span.text.trim();
        if trimmed.is_empty() {
            continue;
        }

        // The register never survives a line change.
        if let Some((_, line, _)) = register {
            if line != span.line_index {
                register = None;
            }
        }

        let x_pt = span.bbox.x * page.width_pt;

        // Large-tier digits become the kroner part, overwriting any
        // previous unconsumed register.
        if span.font_size >= profile.large_font_pt
            && trimmed.len() <= 3
            && trimmed.bytes().all(|b| b.is_ascii_digit())
        {
            let kroner: u32 = trimmed.parse().unwrap_or(0);
            register = Some((kroner, span.line_index, x_pt));
            continue;
        }

        // Whole-kroner completion: ".-" family on the same line.
        if let Some((kroner, line, x)) = register {
            if WHOLE_KRONER_MARKERS.contains(&trimmed) {
                anchors.push(PriceAnchor {
                    value: kroner as f64,
                    page: page.number,
                    line_index: line,
                    x,
                    origin: PriceOrigin::LargeFontNumeric,
                });
                register = None;
                continue;
            }

            // Øre completion: a two-digit span in the mid tier.
            if span.font_size >= profile.ore_font_pt.0
                && span.font_size < profile.ore_font_pt.1
                && trimmed.len() == 2
                && trimmed.bytes().all(|b| b.is_ascii_digit())
            {
                let ore: u32 = trimmed.parse().unwrap_or(0);
                anchors.push(PriceAnchor {
                    value: kroner as f64 + ore as f64 / 100.0,
                    page: page.number,
                    line_index: line,
                    x,
                    origin: PriceOrigin::LargeFontNumeric,
                });
                register = None;
                continue;
            }
        }

        // Dash-suffix chains additionally typeset the whole price in a
        // single large span.
        if profile.price_style == PriceStyle::DashSuffix
            && span.font_size >= profile.large_font_pt
        {
            if let Some(caps) = RE_DASH_PRICE.captures(trimmed) {
                anchors.push(PriceAnchor {
                    value: caps[1].parse::<f64>().unwrap_or(0.0),
                    page: page.number,
                    line_index: span.line_index,
                    x: x_pt,
                    origin: PriceOrigin::TextualDashForm,
                });
                register = None;
            } else if let Some(caps) = RE_DECIMAL_PRICE.captures(trimmed) {
                let kroner: f64 = caps[1].parse().unwrap_or(0.0);
                let ore: f64 = caps[2].parse().unwrap_or(0.0);
                anchors.push(PriceAnchor {
                    value: kroner + ore / 100.0,
                    page: page.number,
                    line_index: span.line_index,
                    x: x_pt,
                    origin: PriceOrigin::DecimalLiteral,
                });
                register = None;
            }
        }
    }

    log::debug!("page {}: {} price anchors", page.number, anchors.len());
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::layout::{Page, Span};
    use crate::profile::{NETTO, REMA};

    fn span(text: &str, font_size: f32, line_index: usize, x: f32) -> Span {
        Span {
            text: text.to_string(),
            bbox: Rect::new(x, 0.5, 0.1, 0.05),
            font_size,
            page: 1,
            line_index,
        }
    }

    fn page(spans: Vec<Span>) -> Page {
        Page {
            number: 1,
            width_pt: 1000.0,
            height_pt: 1000.0,
            spans,
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_whole_kroner_form() {
        let p = page(vec![span("15", 64.0, 14, 0.10), span(".-", 32.0, 14, 0.16)]);
        let anchors = locate_prices(&p, &NETTO);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].value, 15.0);
        assert_eq!(anchors[0].line_index, 14);
        assert_eq!(anchors[0].origin, PriceOrigin::LargeFontNumeric);
        // x is the kroner glyph's left edge in points
        assert!((anchors[0].x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_ore_form() {
        let p = page(vec![span("29", 58.0, 3, 0.1), span("95", 22.0, 3, 0.2)]);
        let anchors = locate_prices(&p, &NETTO);
        assert_eq!(anchors.len(), 1);
        assert!((anchors[0].value - 29.95).abs() < 1e-9);
    }

    #[test]
    fn test_font_tier_boundary() {
        // 49.9pt digits are body text; 50.0pt digits are a kroner glyph.
        let below = page(vec![span("15", 49.9, 0, 0.1), span(".-", 32.0, 0, 0.2)]);
        assert!(locate_prices(&below, &NETTO).is_empty());

        let at = page(vec![span("15", 50.0, 0, 0.1), span(".-", 32.0, 0, 0.2)]);
        assert_eq!(locate_prices(&at, &NETTO).len(), 1);
    }

    #[test]
    fn test_ore_tier_boundaries() {
        // 50pt second span is a new kroner glyph, not an øre part.
        let p = page(vec![span("29", 58.0, 0, 0.1), span("95", 50.0, 0, 0.2)]);
        assert!(locate_prices(&p, &NETTO).is_empty());

        // Below 20pt the two digits are body text.
        let p = page(vec![span("29", 58.0, 0, 0.1), span("95", 19.0, 0, 0.2)]);
        assert!(locate_prices(&p, &NETTO).is_empty());
    }

    #[test]
    fn test_lone_kroner_is_discarded() {
        let p = page(vec![span("15", 64.0, 0, 0.1), span("Mælk", 12.0, 1, 0.1)]);
        assert!(locate_prices(&p, &NETTO).is_empty());
    }

    #[test]
    fn test_marker_on_next_line_does_not_complete() {
        let p = page(vec![span("15", 64.0, 0, 0.1), span(".-", 32.0, 1, 0.1)]);
        assert!(locate_prices(&p, &NETTO).is_empty());
    }

    #[test]
    fn test_new_kroner_overwrites_register() {
        let p = page(vec![
            span("15", 64.0, 0, 0.1),
            span("29", 64.0, 0, 0.3),
            span(".-", 32.0, 0, 0.4),
        ]);
        let anchors = locate_prices(&p, &NETTO);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].value, 29.0);
        assert!((anchors[0].x - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_rema_dash_suffix() {
        let p = page(vec![span("49,-", 56.0, 5, 0.2)]);
        let anchors = locate_prices(&p, &REMA);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].value, 49.0);
        assert_eq!(anchors[0].origin, PriceOrigin::TextualDashForm);

        // The same span is body text under the Netto profile.
        assert!(locate_prices(&p, &NETTO).is_empty());
    }

    #[test]
    fn test_rema_decimal_literal() {
        let p = page(vec![span("24,95", 52.0, 2, 0.2)]);
        let anchors = locate_prices(&p, &REMA);
        assert_eq!(anchors.len(), 1);
        assert!((anchors[0].value - 24.95).abs() < 1e-9);
        assert_eq!(anchors[0].origin, PriceOrigin::DecimalLiteral);
    }

    #[test]
    fn test_rema_unicode_minus() {
        let p = page(vec![span("12,−", 56.0, 0, 0.1)]);
        let anchors = locate_prices(&p, &REMA);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].value, 12.0);
    }

    #[test]
    fn test_rema_small_decimal_is_ignored() {
        let p = page(vec![span("49,95", 14.0, 0, 0.1)]);
        assert!(locate_prices(&p, &REMA).is_empty());
    }
}
