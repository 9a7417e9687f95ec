//! Text hygiene: skip-line classification, product-name assembly, variant
//! splitting, quantity extraction and the final product validator.
//!
//! The heart of this module is a table of named patterns. Each pattern has
//! a name, a compiled regex, and a target deciding where it applies:
//!
//! - `BlockSkip`: the line never starts or merges into an offer block
//!   (marketing prose, footers, instructions, price tables);
//! - `NameMergeSkip`: the line may sit inside a block but is not product
//!   name material (lone quantity tokens, price remnants, lowercase
//!   mid-sentence fragments);
//! - `ValidatorReject`: a merged name matching the pattern is not a
//!   product (cooking instructions, campaign prose, month headings).
//!
//! Patterns are retailer-tuned: the common table applies everywhere, and
//! the Rema family adds chain slogans, recipe bullets and app-only
//! prompts. Naming each pattern keeps the table testable and diffable;
//! bump the scanner version when touching any entry.

use lazy_static::lazy_static;
use regex::Regex;

use crate::profile::PatternFamily;
use crate::units::AmountUnit;

/// Where a named pattern applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTarget {
    /// Line never starts or merges into a block
    BlockSkip,
    /// Line is kept in the block but skipped when merging the product name
    NameMergeSkip,
    /// A merged product name matching this is rejected
    ValidatorReject,
}

/// A named, targeted hygiene pattern.
pub struct NamedPattern {
    /// Stable name used in tests and tuning diffs
    pub name: &'static str,
    /// Where the pattern applies
    pub target: PatternTarget,
    /// Match against the raw line instead of the lowercased line.
    /// Needed by the case-shape patterns (uppercase banners, lowercase
    /// fragments).
    pub raw: bool,
    /// Compiled regex
    pub regex: Regex,
}

fn p(name: &'static str, target: PatternTarget, re: &str) -> NamedPattern {
    NamedPattern {
        name,
        target,
        raw: false,
        regex: Regex::new(re).unwrap(),
    }
}

fn p_raw(name: &'static str, target: PatternTarget, re: &str) -> NamedPattern {
    NamedPattern {
        name,
        target,
        raw: true,
        regex: Regex::new(re).unwrap(),
    }
}

lazy_static! {
    /// Patterns shared by all retailer families.
    static ref COMMON_PATTERNS: Vec<NamedPattern> = {
        use PatternTarget::*;
        vec![
            // Meta and footer lines
            p("unit-price-line", BlockSkip, r"^pr\.\s*\d"),
            p("max-limit-line", BlockSkip, r"^max\.\s*\d"),
            p("literal-kr-price", BlockSkip, r"^\d+[.,]\d+\s*kr"),
            p("savings-banner", BlockSkip, r"^spar\s"),
            p("included-note", BlockSkip, r"^inkl\."),
            p("see-more", BlockSkip, r"^se\s+flere"),
            p("valid-week-note", BlockSkip, r"^gælder\s+(kun\s+)?i\s+uge"),
            p("kg-price-table", BlockSkip, r"^\d+\s*kg\..*\d"),
            p("litre-price-table", BlockSkip, r"^liter\s+\d"),
            p("lone-gram-line", BlockSkip, r"^\d+\s*g$"),
            p("reservation-note", BlockSkip, r"^forbehold\s+for"),
            p("store-availability", BlockSkip, r"^flere\s+butikker"),
            p("shown-products-note", BlockSkip, r"^de\s+viste\s+produkt"),
            p("footnote", BlockSkip, r"^\*baseret"),
            p("read-more", BlockSkip, r"^læs\s+mere"),
            p("bare-range", BlockSkip, r"^\d+-\d+$"),
            p("website", BlockSkip, r"^www\."),
            p("price-validity-note", BlockSkip, r"prisen\s+gælder\s+kun"),
            // Marketing prose with imperative openings
            p("find-prompt", BlockSkip, r"^find\s+"),
            p("win-prompt", BlockSkip, r"^vind\s+"),
            p("each-purchase-prompt", BlockSkip, r"^hvert\s+"),
            p("buy-trigger-prompt", BlockSkip, r"^når\s+du\s+køber"),
            p("donation-note", BlockSkip, r"^dit\s+bidrag"),
            p("participation-note", BlockSkip, r"^deltagelse\s+kræver"),
            p("receipt-campaign", BlockSkip, r"^jo\s+flere\s+kvittering"),
            p("impersonal-note", BlockSkip, r"^upersonlige"),
            p("meal-banner", BlockSkip, r"^til\s+måltider"),
            // In-product residue: quantity tokens and price remnants that sit
            // on their own line inside a block
            p("unit-price-prefix", NameMergeSkip, r"^pr\.\s"),
            p("quantity-range-line", NameMergeSkip, r"^\d+[-–]\d+\s*(g|kg|ml|l)"),
            p("lone-quantity-line", NameMergeSkip, r"^\d+\s*(g|kg|ml|l|cl|stk)\.?$"),
            p("dash-price-line", NameMergeSkip, r"^\d+\s*[.,]\s*-\s*$"),
            p("decimal-price-line", NameMergeSkip, r"^\d+[.,]\d{2}$"),
            p("bare-number-line", NameMergeSkip, r"^\d+$"),
            p_raw("lowercase-fragment", NameMergeSkip, r"^[a-zæøå]"),
        ]
    };

    /// Netto-family additions (Salling seasonal campaigns and slogans).
    static ref NETTO_PATTERNS: Vec<NamedPattern> = {
        use PatternTarget::*;
        vec![
            p("spot-goods", BlockSkip, r"^spotvarer"),
            p("green-christmas", BlockSkip, r"^en\s+gr[øo]n\s+jul"),
            p("meat-slogan", BlockSkip, r"^k[øo]d\s+til\s+netto"),
            p("everyone-slogan", BlockSkip, r"^alle\s+skal"),
            p("afford-slogan", BlockSkip, r"^ha.*r[åa]d\s+til"),
            p("organic-christmas", BlockSkip, r"^[øo]kologisk\s+jul"),
            p("rinsed-note", BlockSkip, r"^skyllet\s+og"),
            p("ready-to-use", BlockSkip, r"^klar\s+til\s+brug"),
            p("quality-slogan", BlockSkip, r"^god\s+kvalitet"),
            p("assortment-slogan", BlockSkip, r"^bredt\s+udvalg"),
            p("everything-for", BlockSkip, r"^alt\s+til"),
            p("with-our", BlockSkip, r"^med\s+vores"),
            p("dairy-slogan", BlockSkip, r"^magisk\s+mejeri"),
            p("topped-slogan", BlockSkip, r"^h[øo]jt\s*belagt"),
            p("clean-christmas", BlockSkip, r"^rent\s+i\s+jul"),
            p("new-world-slogan", BlockSkip, r"^en\s+ny\s+verden"),
            p("play-slogan", BlockSkip, r"^leg\s+og\s+lur"),
            p("christmas-banner", BlockSkip, r"^netto\s+jul"),
            p("christmas-seals", BlockSkip, r"^julemærker"),
        ]
    };

    /// Rema-family additions: slogans, recipe content, app-only prompts.
    static ref REMA_PATTERNS: Vec<NamedPattern> = {
        use PatternTarget::*;
        vec![
            p("unit-price-decimal", BlockSkip, r"^\d+[.,]\d+\s*pr\."),
            p("valid-from-note", BlockSkip, r"^gælder\s+fra"),
            p("offer-validity", BlockSkip, r"^tilbuddet\s+gælder"),
            p("reservation-full", BlockSkip, r"^vi\s+tager\s+forbehold"),
            p("reservation-with", BlockSkip, r"^med\s+forbehold"),
            p("price-changes-note", BlockSkip, r"^priser.*ændringer"),
            p("see-current", BlockSkip, r"^se\s+aktuelle"),
            p("this-week-only", BlockSkip, r"^kun\s+i\s+denne\s+uge"),
            p("chain-banner", BlockSkip, r"^rema\s*1000"),
            p("good-price-slogan", BlockSkip, r"^god\s+pris"),
            p("extra-good-slogan", BlockSkip, r"^ekstra\s+god"),
            p("always-cheap", BlockSkip, r"^altid\s+billig"),
            p("multi-buy-note", BlockSkip, r"^ved\s+køb\s+af"),
            p("more-than-note", BlockSkip, r"^flere\s+end"),
            p("per-customer", BlockSkip, r"^pr\.\s+kunde"),
            p("price-is-note", BlockSkip, r"^er\s+prisen"),
            p("per-piece-note", BlockSkip, r"^pr\.\s+stk"),
            p("per-half-note", BlockSkip, r"^pr\.\s+½"),
            p("up-to-note", BlockSkip, r"^op\s+til"),
            p("lot-goods", BlockSkip, r"^partivare"),
            p("opening-hours-roman", BlockSkip, r"^kl\.\s*[ivx]+"),
            p("foreign-tag", BlockSkip, r"udenlandske?$"),
            p("lone-dash-price", BlockSkip, r"^\d+\s*[.,]\s*-\s*$"),
            p_raw("uppercase-banner-line", BlockSkip, r"^[A-ZÆØÅ\s!]+$"),
            p("party-banner", BlockSkip, r"^fest"),
            p("super-offer-banner", BlockSkip, r"^super\s+tilbud"),
            p("weekly-banner", BlockSkip, r"^ugens\s+"),
            p("huge-banner", BlockSkip, r"^kæmpe\s+"),
            p("pieces-per-note", BlockSkip, r"^\d+\s*stk\.?\s*pr\."),
            p("qr-prompt", BlockSkip, r"^scan\s+qr"),
            p("recipe-prompt", BlockSkip, r"^se\s+opskrift"),
            p("recipe-prompt-and", BlockSkip, r"^og\s+se\s+opskrift"),
            p("newspaper-prompt", BlockSkip, r"^se\s+avisen"),
            p("crate-line", BlockSkip, r"^kasse\s+med"),
            p("recipe-bullet", BlockSkip, r"^[•·]"),
            p("chain-website", BlockSkip, r"www\.\w+\.dk"),
            p("mobilepay-note", BlockSkip, r"^mobilepay"),
            p("dankort-note", BlockSkip, r"^dankort"),
            p("print-code", BlockSkip, r"hl-repro"),
            p("scan-code-prompt", BlockSkip, r"^scan\s+koden"),
            p("self-scan-note", BlockSkip, r"med\s+scan\s+selv"),
            p("self-scan-prompt", BlockSkip, r"^hent\s+scan\s+selv"),
            p("all-week-note", BlockSkip, r"^alle\s+ugens\s+dage"),
            p("see-more-at", BlockSkip, r"^se\s+mere\s+på"),
            p("opening-hours", BlockSkip, r"^se\s+åbningstid"),
            p("local-store-note", BlockSkip, r"^i\s+din\s+lokale"),
            p("some-stores-note", BlockSkip, r"^nogle\s+butikker"),
            p("payment-note", BlockSkip, r"^du\s+kan\s+også\s+betale"),
            p("green-slogan", BlockSkip, r"grønnere\s+retter"),
            p("discount-slogan", BlockSkip, r"discount\s+med\s+holdning"),
            p("while-shopping", BlockSkip, r"mens\s+du\s+handler"),
            p("digital-flyers", BlockSkip, r"aviser\s+digitalt"),
            p("it-is-discount", BlockSkip, r"^det\s+er\s+discount"),
            p("multi-bottle-buy", BlockSkip, r"^køb\s+\d+\s+fl"),
            p("multi-buy-prompt", BlockSkip, r"^køb\s+\d+\s+og"),
            p("mixing-ratio", BlockSkip, r"^blandingsforhold"),
            p("recipe-method", BlockSkip, r"^fremgangsmåde"),
            p("frying-instruction", BlockSkip, r"^steges\s+i"),
            p("core-temperature", BlockSkip, r"kernetemperatur"),
            p("preparation-time", BlockSkip, r"^tilberedningstid"),
            p("temperature-line", BlockSkip, r"^\d+\s*°"),
            p("minutes-line", BlockSkip, r"^i\s+ca\.\s+\d+\s+min"),
            p("week-code", BlockSkip, r"^uge\s+\d+/\d+"),
            p("wine-magazine", BlockSkip, r"^vinbladet"),
            p("editorial-opening", BlockSkip, r"^på\s+årets"),
            p("recipe-heading", BlockSkip, r"^opskrift"),
        ]
    };

    /// App-/member-only offer markers per family.
    static ref APP_PATTERNS_NETTO: Vec<Regex> = vec![
        Regex::new(r"gælder\s+kun\s+med\s+netto\+").unwrap(),
        Regex::new(r"netto\+\s*appen").unwrap(),
        Regex::new(r"kun\s+med\s+appen").unwrap(),
    ];
    static ref APP_PATTERNS_REMA: Vec<Regex> = vec![
        Regex::new(r"kun\s+med\s+app").unwrap(),
        Regex::new(r"medlemspris").unwrap(),
        Regex::new(r"member\s*price").unwrap(),
        Regex::new(r"kun\s+for\s+medlemmer").unwrap(),
    ];

    // --- name cleaning -----------------------------------------------------

    static ref RE_CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x1f\u{7f}-\u{9f}]").unwrap();
    static ref RE_MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();

    static ref RE_TRAILING_REMNANTS: Vec<Regex> = vec![
        Regex::new(r"\s+\d+\s*[.,]\s*-\s*$").unwrap(),
        Regex::new(r"\s+\d+[.,]\d{2}\s*$").unwrap(),
        Regex::new(r"\s+\d+\.\s*$").unwrap(),
        Regex::new(r"\s*kr\.?\s*$").unwrap(),
        Regex::new(r"\s*,-\s*$").unwrap(),
        Regex::new(r"\s*\.-\s*$").unwrap(),
        Regex::new(r"\s*-\s*$").unwrap(),
    ];
    static ref RE_LEADING_REMNANTS: Vec<Regex> = vec![
        Regex::new(r"(?i)^prisen\s+gælder[^a-zæøå]*").unwrap(),
        Regex::new(r"(?i)^gælder\s+fra[^a-zæøå]*\d{4}\s*").unwrap(),
        Regex::new(r"(?i)^ved\s+køb\s+af\s+flere\s+end\s+\d+\s*stk\.?\s*(?:er\s+prisen\s*)?").unwrap(),
        Regex::new(r"^\d+\s*[.,]\s*-\s*").unwrap(),
        Regex::new(r"^\d+[.,]\d{2}\s+").unwrap(),
    ];

    // --- variant splitting -------------------------------------------------

    static ref RE_ELLER_SPLIT: Regex = Regex::new(r"(?i)^(.+?)\s+eller\s+(.+)$").unwrap();
    static ref RE_DIGIT_SLASH: Regex = Regex::new(r"\d/\d").unwrap();

    // --- quantities, unit prices, comments ---------------------------------

    static ref RE_QUANTITY: Regex = Regex::new(r"(\d+[-–]?\d*)\s*(g|kg|ml|l|cl|stk)").unwrap();
    static ref RE_QUANTITY_VALUE: Regex = Regex::new(r"^[\d.,]+").unwrap();
    static ref RE_MULTIPACK: Regex =
        Regex::new(r"(\d+)\s*x\s*(\d+(?:[.,]\d+)?)\s*(g|kg|ml|cl|dl|l|stk)").unwrap();
    static ref RE_PACK: Regex = Regex::new(r"(\d+)\s*-?\s*pak").unwrap();
    static ref RE_SIMPLE_QUANTITY: Regex =
        Regex::new(r"(\d+(?:[.,]\d+)?)\s*(g|kg|ml|cl|dl|l|liter|stk)").unwrap();
    static ref RE_UNIT_PRICE_AFTER: Regex =
        Regex::new(r"pr\.?\s*(kg|l|liter|stk)[.\s]*(?:max\.?)?\s*([\d,]+)").unwrap();
    static ref RE_UNIT_PRICE_BEFORE: Regex =
        Regex::new(r"([\d.,]+)\s*pr\.?\s*(kg|l|liter|stk|½\s*kg)").unwrap();
    static ref RE_UNIT_PRICE_BARE: Regex = Regex::new(r"pr\.\s*(kg|l|stk)").unwrap();
    static ref RE_COMMENT_MAX: Regex = Regex::new(r"(max\.?\s*\d+\s*\w+)").unwrap();

    // --- validator ---------------------------------------------------------

    static ref RE_ONLY_DIGITS_DASHES: Regex = Regex::new(r"^[\d\s\-]+$").unwrap();
    static ref RE_PAK_ONLY: Regex = Regex::new(r"^\d+-pak$").unwrap();
    static ref RE_DASH_PRICE_ONLY: Regex = Regex::new(r"^\d+\s*[.,]\s*-\s*$").unwrap();
    static ref RE_DECIMAL_PRICE_ONLY: Regex = Regex::new(r"^\d+[.,]\d{2}$").unwrap();
    static ref RE_UPPERCASE_BANNER: Regex = Regex::new(r"^[A-ZÆØÅ\s!]+$").unwrap();
    static ref RE_EMBEDDED_DASH_PRICE: Regex = Regex::new(r"\d+\s*[.,]\s*-").unwrap();
    static ref RE_AMPERSAND_START: Regex = Regex::new(r"^&\s").unwrap();
    static ref RE_MONTH_PREFIX: Regex = Regex::new(
        r"^(januar|februar|marts|april|maj|juni|juli|august|september|oktober|november|december)(\s|$)"
    ).unwrap();

    static ref VALIDATOR_PATTERNS: Vec<NamedPattern> = {
        use PatternTarget::*;
        vec![
            // Actions and instructions
            p("weigh-yourself", ValidatorReject, r"^vej\s+selv"),
            p("scan-action", ValidatorReject, r"^scan\s+(og|&|koden|qr)"),
            p("participate-action", ValidatorReject, r"^deltag\s+"),
            p("signup-action", ValidatorReject, r"^tilmeld\s+"),
            p("fetch-action", ValidatorReject, r"^hent\s+"),
            p("see-action", ValidatorReject, r"^se\s+(mere|avisen|opskrift|åbningstid)"),
            p("read-more-action", ValidatorReject, r"^læs\s+mere"),
            p("find-action", ValidatorReject, r"^find\s+"),
            p("win-action", ValidatorReject, r"^vind\s+"),
            p("multi-buy-action", ValidatorReject, r"^køb\s+\d+\s+(og|for)"),
            p("save-action", ValidatorReject, r"^spar\s+"),
            // Cooking instructions (mid-recipe fragments)
            p("fry-instruction", ValidatorReject, r"^steges\s+"),
            p("boil-instruction", ValidatorReject, r"^koges\s+"),
            p("bake-instruction", ValidatorReject, r"^bages\s+"),
            p("serve-instruction", ValidatorReject, r"^serveres\s+"),
            p("prepare-instruction", ValidatorReject, r"^tilberedes\s+"),
            p("wrap-instruction", ValidatorReject, r"^pakkes\s+ind"),
            p("place-instruction", ValidatorReject, r"^lægges\s+"),
            p("cut-instruction", ValidatorReject, r"^skæres\s+"),
            p("temp-reached", ValidatorReject, r"^er\s+opnået"),
            p("is-ready", ValidatorReject, r"^er\s+klar"),
            p("is-done", ValidatorReject, r"^er\s+færdig"),
            p("temperature", ValidatorReject, r"^\d+\s*°"),
            p("minutes-instruction", ValidatorReject, r"^i\s+ca\.\s+\d+\s+min"),
            p("core-temp-instruction", ValidatorReject, r"^kernetemperatur"),
        ]
    };
}

/// Words too generic to be a product on their own.
const GENERIC_WORDS: [&str; 22] = [
    "dybfrost",
    "frost",
    "frisk",
    "dansk",
    "økologisk",
    "udenlandsk",
    "imported",
    "december",
    "januar",
    "februar",
    "marts",
    "april",
    "maj",
    "juni",
    "juli",
    "august",
    "september",
    "oktober",
    "november",
    "tilbehør",
    "diverse",
    "blandet",
];

/// Promotional openings that disqualify a merged name.
const MARKETING_STARTS: [&str; 25] = [
    "gælder",
    "forbehold",
    "flere butikker",
    "de viste",
    "baseret på",
    "netto",
    "tilbud",
    "member",
    "medlems",
    "meget mere",
    "julefrokost",
    "fest",
    "super",
    "åbningstid",
    "du kan også",
    "hent scan",
    "mobilepay",
    "dankort",
    "se mere",
    "julekalender",
    "konkurrence",
    "julemærker",
    "upersonlige",
    "dit bidrag",
    "når du køber",
];

/// Marketing phrases that disqualify a name wherever they appear.
const MARKETING_KEYWORDS: [&str; 11] = [
    "julefrokost",
    "meget mere",
    "super tilbud",
    "kæmpe tilbud",
    "julekalender",
    "konkurrence",
    "vind ",
    "deltag ",
    "normalpris",
    "før ",
    "spar ",
];

/// Leading conjunctions that make a price-less offer suspicious.
const PROBLEMATIC_STARTS: [&str; 8] = [
    "og ", "se ", "kasse med", "& ", "med ", "eller ", "samt ", "inkl",
];

/// Remove control characters and collapse runs of whitespace.
pub fn clean_text(text: &str) -> String {
    let without_controls = RE_CONTROL_CHARS.replace_all(text, "");
    RE_MULTI_SPACE
        .replace_all(&without_controls, " ")
        .trim()
        .to_string()
}

fn family_patterns(family: PatternFamily) -> impl Iterator<Item = &'static NamedPattern> {
    let extra: &'static Vec<NamedPattern> = match family {
        PatternFamily::Netto => &NETTO_PATTERNS,
        PatternFamily::Rema => &REMA_PATTERNS,
    };
    COMMON_PATTERNS.iter().chain(extra.iter())
}

fn matches_target(text: &str, family: PatternFamily, target: PatternTarget) -> bool {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    family_patterns(family).any(|pat| {
        pat.target == target
            && pat
                .regex
                .is_match(if pat.raw { trimmed } else { &lowered })
    })
}

/// Does this line belong to the non-product families (meta, footer,
/// marketing)? Such lines never start or merge into a block.
pub fn is_skip_line(text: &str, family: PatternFamily) -> bool {
    matches_target(text, family, PatternTarget::BlockSkip)
}

/// Is this an app-/member-only offer marker?
pub fn is_app_offer(text: &str, family: PatternFamily) -> bool {
    let lowered = text.to_lowercase();
    let patterns: &Vec<Regex> = match family {
        PatternFamily::Netto => &APP_PATTERNS_NETTO,
        PatternFamily::Rema => &APP_PATTERNS_REMA,
    };
    patterns.iter().any(|re| re.is_match(&lowered))
}

/// Merge a block's lines into a product name.
///
/// At most four non-skip lines contribute; quantity tokens, price remnants
/// and lowercase mid-sentence fragments are passed over.
pub fn merge_product_name(line_texts: &[&str], family: PatternFamily) -> String {
    let mut parts: Vec<String> = Vec::new();

    for raw in line_texts {
        let text = clean_text(raw);
        if text.chars().count() <= 1 {
            continue;
        }
        if is_skip_line(&text, family)
            || matches_target(&text, family, PatternTarget::NameMergeSkip)
        {
            continue;
        }
        parts.push(text);
        if parts.len() >= 4 {
            break;
        }
    }

    clean_text(&parts.join(" "))
}

/// Strip price remnants and validity prefixes off a merged name.
pub fn clean_product_name(name: &str) -> String {
    let mut result = name.trim().to_string();

    for re in RE_LEADING_REMNANTS.iter() {
        result = re.replace(&result, "").to_string();
    }
    // Trailing remnants can stack ("... 500 g 15.-"), so strip repeatedly.
    loop {
        let before = result.len();
        for re in RE_TRAILING_REMNANTS.iter() {
            result = re.replace(&result, "").to_string();
        }
        if result.len() == before {
            break;
        }
    }

    result.trim().to_string()
}

/// Split a product name into the main product and its variants.
///
/// `"X eller Y"` makes X the product and Y (comma-separated) the variants;
/// otherwise a single `/` not between digits splits when both sides are at
/// least three characters.
pub fn split_variants(name: &str) -> (String, Vec<String>) {
    if let Some(caps) = RE_ELLER_SPLIT.captures(name) {
        let main = caps[1].trim().to_string();
        let tail = caps[2].trim();
        let variants = if tail.contains(',') {
            tail.split(',').map(|v| v.trim().to_string()).collect()
        } else {
            vec![tail.to_string()]
        };
        return (main, variants);
    }

    if name.matches('/').count() == 1 && !RE_DIGIT_SLASH.is_match(name) {
        let mut parts = name.splitn(2, '/');
        let left = parts.next().unwrap_or("").trim();
        let right = parts.next().unwrap_or("").trim();
        if left.chars().count() >= 3 && right.chars().count() >= 3 {
            return (left.to_string(), vec![right.to_string()]);
        }
    }

    (name.trim().to_string(), Vec::new())
}

/// A quantity reading pulled out of block text.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityReading {
    /// The matched source text, e.g. "500 g"
    pub raw: String,
    /// Leading numeric value, if parseable
    pub value: Option<f64>,
    /// The unit token, mapped through the synonym table
    pub unit: Option<AmountUnit>,
}

/// First quantity reading in the block's lines, in line order.
pub fn extract_quantity(line_texts: &[&str]) -> Option<QuantityReading> {
    for text in line_texts {
        let lowered = text.to_lowercase();
        if let Some(caps) = RE_QUANTITY.captures(&lowered) {
            let raw = caps[0].to_string();
            let value = RE_QUANTITY_VALUE
                .find(&caps[1])
                .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok());
            let unit = AmountUnit::parse(&caps[2]);
            return Some(QuantityReading { raw, value, unit });
        }
    }
    None
}

/// Every quantity reading in the block, for learning-mode candidates.
pub fn all_quantity_readings(line_texts: &[&str]) -> Vec<String> {
    let mut readings = Vec::new();
    for text in line_texts {
        let lowered = text.to_lowercase();
        for caps in RE_QUANTITY.captures_iter(&lowered) {
            readings.push(caps[0].to_string());
        }
    }
    readings
}

/// Parse free-form quantity text into `(value, unit, pack_count)`.
///
/// Handles `"6 x 33 cl"`, `"6-pak"` and `"500 g"` shapes.
pub fn parse_quantity_text(
    text: &str,
) -> Option<(Option<f64>, Option<AmountUnit>, Option<u32>)> {
    let lowered = text.to_lowercase();

    if let Some(caps) = RE_MULTIPACK.captures(&lowered) {
        let pack: u32 = caps[1].parse().ok()?;
        let value: f64 = caps[2].replace(',', ".").parse().ok()?;
        return Some((Some(value), AmountUnit::parse(&caps[3]), Some(pack)));
    }

    if let Some(caps) = RE_PACK.captures(&lowered) {
        let pack: u32 = caps[1].parse().ok()?;
        return Some((None, None, Some(pack)));
    }

    if let Some(caps) = RE_SIMPLE_QUANTITY.captures(&lowered) {
        let value: f64 = caps[1].replace(',', ".").parse().ok()?;
        return Some((Some(value), AmountUnit::parse(&caps[2]), None));
    }

    None
}

/// First explicit per-unit price printed in the block ("pr. kg 79,95").
pub fn extract_unit_price(line_texts: &[&str]) -> Option<f64> {
    for text in line_texts {
        let lowered = text.to_lowercase();
        if let Some(caps) = RE_UNIT_PRICE_AFTER.captures(&lowered) {
            if let Ok(value) = caps[2].replace(',', ".").parse::<f64>() {
                return Some(value);
            }
        }
        if let Some(caps) = RE_UNIT_PRICE_BEFORE.captures(&lowered) {
            if let Ok(value) = caps[1].replace(',', ".").parse::<f64>() {
                return Some(value);
            }
        }
    }
    None
}

/// Does the block mention a per-unit price at all?
pub fn has_unit_price_text(line_texts: &[&str]) -> bool {
    extract_unit_price(line_texts).is_some()
        || line_texts
            .iter()
            .any(|t| RE_UNIT_PRICE_BARE.is_match(&t.to_lowercase()))
}

/// Purchase-limit or lot-goods comment, if any ("Max. 3 stk", "Partivare").
pub fn extract_comment(line_texts: &[&str]) -> Option<String> {
    for text in line_texts {
        let lowered = text.to_lowercase();
        if let Some(caps) = RE_COMMENT_MAX.captures(&lowered) {
            let raw = caps[1].to_string();
            let mut chars = raw.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => raw,
            };
            return Some(capitalized);
        }
        if lowered.contains("partivare") {
            return Some("Partivare".to_string());
        }
    }
    None
}

/// Does the block text mention a container deposit?
pub fn has_deposit_mention(line_texts: &[&str]) -> bool {
    line_texts.iter().any(|t| t.to_lowercase().contains("pant"))
}

/// Final gate: is this merged name an actual product?
///
/// `confidence` is the offer's overall confidence and `has_price` whether a
/// price anchor was attached; both tighten the rules for price-less offers.
pub fn is_valid_product(name: &str, confidence: f64, has_price: bool) -> bool {
    let name = name.trim();
    let lowered = name.to_lowercase();
    let len = name.chars().count();

    // Structural shapes that can never be products.
    if len < 3 {
        return false;
    }
    if RE_ONLY_DIGITS_DASHES.is_match(name)
        || RE_PAK_ONLY.is_match(&lowered)
        || RE_DASH_PRICE_ONLY.is_match(name)
        || RE_DECIMAL_PRICE_ONLY.is_match(name)
        || RE_AMPERSAND_START.is_match(name)
    {
        return false;
    }
    if RE_UPPERCASE_BANNER.is_match(name) && len > 5 {
        return false;
    }
    if RE_EMBEDDED_DASH_PRICE.is_match(name) && len < 10 {
        return false;
    }

    // Mid-sentence fragments start lowercase.
    if name.chars().next().is_some_and(|c| c.is_lowercase()) {
        return false;
    }

    if GENERIC_WORDS.contains(&lowered.as_str()) {
        return false;
    }
    if RE_MONTH_PREFIX.is_match(&lowered) {
        return false;
    }

    if VALIDATOR_PATTERNS.iter().any(|pat| pat.regex.is_match(&lowered)) {
        return false;
    }

    if MARKETING_STARTS.iter().any(|s| lowered.starts_with(s)) {
        return false;
    }
    if MARKETING_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return false;
    }

    // Price-less offers must clear a higher bar.
    if !has_price {
        if confidence < 0.7 {
            return false;
        }
        if len < 10 {
            return false;
        }
        if PROBLEMATIC_STARTS.iter().any(|s| lowered.starts_with(s)) {
            return false;
        }
    }

    true
}
