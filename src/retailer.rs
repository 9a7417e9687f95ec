//! Retailer detection from first-page text.
//!
//! Two-pass keyword match. Pass one looks for exclusive store names and
//! takes the first hit at high confidence. Pass two scores broad keywords
//! by occurrence count; `netto` in particular is a common substring and
//! must only be considered after every more specific chain has had its
//! chance. A bare Salling-group mention without a store keyword defaults
//! to Netto at low confidence.

/// How many leading pages participate in retailer detection.
pub const RETAILER_DETECTION_PAGES: usize = 3;

/// An exclusive keyword entry: first match wins.
struct ExclusiveEntry {
    id: &'static str,
    keywords: &'static [&'static str],
    confidence: f64,
}

/// A broad keyword entry: scored by occurrence count.
struct BroadEntry {
    id: &'static str,
    keyword: &'static str,
    confidence: f64,
}

const EXCLUSIVE: [ExclusiveEntry; 11] = [
    ExclusiveEntry {
        id: "rema",
        keywords: &["rema 1000", "rema1000"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "foetex",
        keywords: &["føtex", "foetex"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "bilka",
        keywords: &["bilka"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "superbrugsen",
        keywords: &["superbrugsen", "super brugsen"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "kvickly",
        keywords: &["kvickly"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "365discount",
        keywords: &["365discount", "365 discount", "coop 365"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "lidl",
        keywords: &["lidl"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "aldi",
        keywords: &["aldi"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "spar",
        keywords: &["eurospar"],
        confidence: 0.98,
    },
    ExclusiveEntry {
        id: "meny",
        keywords: &["meny"],
        confidence: 0.95,
    },
    ExclusiveEntry {
        id: "irma",
        keywords: &["irma"],
        confidence: 0.95,
    },
];

const BROAD: [BroadEntry; 3] = [
    BroadEntry {
        id: "netto",
        keyword: "netto",
        confidence: 0.90,
    },
    BroadEntry {
        id: "rema",
        keyword: "rema",
        confidence: 0.85,
    },
    BroadEntry {
        id: "spar",
        keyword: "spar ",
        confidence: 0.80,
    },
];

/// Detect the retailer from concatenated, lowercased first-page text.
///
/// Returns the retailer id and a confidence; `(None, 0.0)` when nothing
/// matches.
pub fn detect_retailer(text: &str) -> (Option<String>, f64) {
    let text = text.to_lowercase();

    for entry in &EXCLUSIVE {
        if entry.keywords.iter().any(|kw| text.contains(kw)) {
            log::debug!("retailer: exclusive match '{}'", entry.id);
            return (Some(entry.id.to_string()), entry.confidence);
        }
    }

    let mut best: Option<(&BroadEntry, usize)> = None;
    for entry in &BROAD {
        let count = text.matches(entry.keyword).count();
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((entry, count));
        }
    }
    if let Some((entry, count)) = best {
        log::debug!("retailer: broad match '{}' ({} occurrences)", entry.id, count);
        return (Some(entry.id.to_string()), entry.confidence);
    }

    // A Salling-group mention without a store keyword: most of their flyer
    // volume is Netto, so guess that at low confidence.
    if text.contains("salling") {
        return (Some("netto".to_string()), 0.70);
    }

    (None, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_match_wins() {
        let (id, conf) = detect_retailer("REMA 1000 tilbudsavis uge 42");
        assert_eq!(id.as_deref(), Some("rema"));
        assert_eq!(conf, 0.98);
    }

    #[test]
    fn test_eurospar_beats_broad_spar() {
        let (id, conf) = detect_retailer("velkommen til eurospar og spar på prisen");
        assert_eq!(id.as_deref(), Some("spar"));
        assert_eq!(conf, 0.98);
    }

    #[test]
    fn test_netto_matched_as_broad_keyword() {
        let (id, conf) = detect_retailer("netto netto netto - spar masser af penge");
        assert_eq!(id.as_deref(), Some("netto"));
        assert_eq!(conf, 0.90);
    }

    #[test]
    fn test_broad_scoring_by_occurrence() {
        // Two bare "rema" mentions outscore one "netto".
        let (id, _) = detect_retailer("rema avisen fra rema og netto");
        assert_eq!(id.as_deref(), Some("rema"));
    }

    #[test]
    fn test_salling_defaults_to_netto() {
        let (id, conf) = detect_retailer("en del af salling group");
        assert_eq!(id.as_deref(), Some("netto"));
        assert_eq!(conf, 0.70);
    }

    #[test]
    fn test_no_match() {
        let (id, conf) = detect_retailer("helt almindelig tekst");
        assert_eq!(id, None);
        assert_eq!(conf, 0.0);
    }
}
