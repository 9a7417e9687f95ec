//! Product category taxonomy: the read-only keyword map.
//!
//! Categories come from an external taxonomy service behind the
//! [`CategorySource`] trait and are cached for five minutes; when the
//! source fails the most recent table keeps serving, and when nothing has
//! ever been fetched a built-in table takes over. Classification scores
//! categories by keyword hits and takes the highest scorer, falling back
//! to "Andet".

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Ordered category table: name to keyword list. Order matters: ties in
/// keyword scoring resolve to the earlier entry, so the table order is part
/// of deterministic output.
pub type CategoryTable = Vec<(String, Vec<String>)>;

/// The catch-all category.
pub const FALLBACK_CATEGORY: &str = "Andet";

/// How long a fetched table stays fresh.
pub const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(300);

/// A provider of the category keyword table.
pub trait CategorySource: Send + Sync {
    /// Fetch the current table. Implementations talk to the taxonomy
    /// service; failures are recovered by the cache layer.
    fn categories(&self) -> Result<CategoryTable>;
}

/// Built-in table used when no source is configured or reachable.
pub struct BuiltinCategories;

impl CategorySource for BuiltinCategories {
    fn categories(&self) -> Result<CategoryTable> {
        Ok(builtin_table())
    }
}

/// The built-in category table.
pub fn builtin_table() -> CategoryTable {
    let entry = |name: &str, keywords: &[&str]| {
        (
            name.to_string(),
            keywords.iter().map(|k| k.to_string()).collect(),
        )
    };
    vec![
        entry(
            "Mejeri",
            &["mælk", "smør", "ost", "yoghurt", "skyr", "fløde", "æg", "arla", "lurpak"],
        ),
        entry(
            "Kød",
            &["kylling", "oksekød", "svinekød", "flæsk", "bacon", "pølse", "hakket", "kød", "medister"],
        ),
        entry(
            "Pålæg",
            &["pålæg", "skinke", "salami", "leverpostej", "spegepølse", "rullepølse"],
        ),
        entry("Fisk", &["laks", "sild", "rejer", "torsk", "makrel", "tun", "fisk"]),
        entry(
            "Frugt & Grønt",
            &["æble", "appelsin", "banan", "tomat", "agurk", "salat", "kartoffel", "gulerod"],
        ),
        entry(
            "Brød & Bagværk",
            &["brød", "boller", "rugbrød", "kage", "wienerbrød"],
        ),
        entry(
            "Drikkevarer",
            &["cola", "juice", "vand", "sodavand", "kaffe", "te"],
        ),
        entry(
            "Øl & Vin",
            &["øl", "vin", "carlsberg", "tuborg", "whisky", "champagne"],
        ),
        entry("Frost", &["is", "frost", "frossen", "pizza"]),
        entry(
            "Morgenmad",
            &["cornflakes", "havregryn", "müsli", "morgenmad"],
        ),
        entry("Kolonial", &["pasta", "ris", "sauce", "ketchup", "konserves"]),
        entry(
            "Snacks",
            &["chips", "slik", "chokolade", "nødder", "popcorn"],
        ),
        entry(
            "Personlig pleje",
            &["shampoo", "tandpasta", "deodorant", "creme"],
        ),
        entry("Rengøring", &["vaskemiddel", "opvask", "rengøring"]),
        entry(
            "Husholdning",
            &["toiletpapir", "køkkenrulle", "folie"],
        ),
        entry("Kæledyr", &["hundefoder", "kattefoder", "kattegrus"]),
        entry("Baby", &["bleer", "babymos", "babymad"]),
        entry("Non-food", &["tøj", "sko", "legetøj", "elektronik"]),
    ]
}

struct CacheSlot {
    table: CategoryTable,
    fetched_at: Instant,
}

/// TTL-caching wrapper around a [`CategorySource`].
///
/// Reads hit the cached table without touching the source; an expired table
/// is refreshed on demand, and a failing source keeps serving the stale
/// table (or the built-in one before the first successful fetch).
pub struct CachedCategories {
    source: Box<dyn CategorySource>,
    cache: Mutex<Option<CacheSlot>>,
    ttl: Duration,
}

impl CachedCategories {
    /// Wrap a source with the standard five-minute TTL.
    pub fn new(source: Box<dyn CategorySource>) -> Self {
        Self::with_ttl(source, CATEGORY_CACHE_TTL)
    }

    /// Wrap a source with a custom TTL.
    pub fn with_ttl(source: Box<dyn CategorySource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
            ttl,
        }
    }

    /// The current category table.
    pub fn table(&self) -> CategoryTable {
        let mut cache = self.cache.lock().unwrap();

        let fresh = cache
            .as_ref()
            .is_some_and(|slot| slot.fetched_at.elapsed() < self.ttl);
        if !fresh {
            match self.source.categories() {
                Ok(table) => {
                    *cache = Some(CacheSlot {
                        table,
                        fetched_at: Instant::now(),
                    });
                }
                Err(err) => {
                    log::warn!("category source failed: {err}; using cached or built-in table");
                    if cache.is_none() {
                        *cache = Some(CacheSlot {
                            table: builtin_table(),
                            fetched_at: Instant::now(),
                        });
                    }
                }
            }
        }

        cache.as_ref().map(|slot| slot.table.clone()).unwrap()
    }

    /// Valid category names, including the catch-all.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table().iter().map(|(n, _)| n.clone()).collect();
        if !names.iter().any(|n| n == FALLBACK_CATEGORY) {
            names.push(FALLBACK_CATEGORY.to_string());
        }
        names
    }

    /// Coerce a normalizer-supplied category into the allowed set.
    pub fn validate(&self, category: Option<&str>) -> String {
        let Some(category) = category else {
            return FALLBACK_CATEGORY.to_string();
        };
        let lowered = category.trim().to_lowercase();
        self.names()
            .into_iter()
            .find(|name| name.to_lowercase() == lowered)
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    }

    /// Classify a product text by keyword hits.
    pub fn classify(&self, product_text: &str) -> String {
        let lowered = product_text.to_lowercase();
        let mut best: Option<(String, usize)> = None;
        for (name, keywords) in self.table() {
            let score = keywords.iter().filter(|kw| lowered.contains(kw.as_str())).count();
            if score > 0 && best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name)
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    }
}

impl Default for CachedCategories {
    fn default() -> Self {
        Self::new(Box::new(BuiltinCategories))
    }
}
