//! Product normalization: raw flyer text to structured fields.
//!
//! Two providers run in order: the language-model backend (when one is
//! configured and reachable) and the deterministic rule set. Replies are
//! coerced at this boundary exactly once (categories into the allowed
//! set, units through the synonym map, containers into the closed enum)
//! so nothing downstream ever sees a raw string for these fields.
//!
//! Results are cached process-wide, keyed by the lowercased trimmed text
//! plus the price rounded to two decimals. The cache serializes writes
//! behind a mutex and evicts half its entries on overflow.

pub mod backend;
pub mod prompt;
pub mod rules;

pub use backend::NormalizeBackend;
pub use prompt::SYSTEM_PROMPT;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::categories::CachedCategories;
use crate::error::{Error, Result};
use crate::units::{AmountUnit, Container};

/// Confidence stamped on single-item backend results.
pub const BACKEND_CONFIDENCE: f64 = 0.9;
/// Confidence stamped on batched backend results.
pub const BACKEND_BATCH_CONFIDENCE: f64 = 0.85;
/// Largest number of products per batch call.
pub const MAX_BATCH_SIZE: usize = 10;
/// Cache capacity; half is evicted on overflow.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Structured fields produced by normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedProduct {
    /// Brand name ("Coca-Cola", "Arla")
    pub brand_norm: Option<String>,
    /// Generic product name; always present after normalization
    pub product_norm: Option<String>,
    /// Variant ("Zero", "Økologisk")
    pub variant_norm: Option<String>,
    /// Category from the taxonomy; "Andet" when nothing fits
    pub category: String,
    /// Package amount value
    pub net_amount_value: Option<f64>,
    /// Package amount unit
    pub net_amount_unit: Option<AmountUnit>,
    /// Number of items in a multipack
    pub pack_count: Option<u32>,
    /// Container type
    pub container_type: Option<Container>,
    /// Deposit in kroner when the source mentioned one
    pub deposit_value: Option<f64>,
    /// Restrictions or remarks ("Max 3 stk")
    pub comment: Option<String>,
    /// Provider confidence stamp
    pub confidence: f64,
}

/// The normalization orchestrator: cache, backend, fallback.
pub struct Normalizer {
    backend: Option<Box<dyn NormalizeBackend>>,
    categories: Arc<CachedCategories>,
    cache: Mutex<HashMap<String, NormalizedProduct>>,
    cache_capacity: usize,
}

impl Normalizer {
    /// Create a normalizer. Without a backend every request takes the
    /// rule-based path.
    pub fn new(backend: Option<Box<dyn NormalizeBackend>>, categories: Arc<CachedCategories>) -> Self {
        if backend.is_none() {
            log::info!("no normalizer backend configured; using rule-based fallback");
        }
        Self {
            backend,
            categories,
            cache: Mutex::new(HashMap::new()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Override the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(2);
        self
    }

    fn cache_key(product_text: &str, price: Option<f64>) -> String {
        let normalized = product_text.trim().to_lowercase();
        match price {
            Some(price) => format!("{normalized}|{price:.2}"),
            None => normalized,
        }
    }

    fn cache_get(&self, key: &str) -> Option<NormalizedProduct> {
        let cache = self.cache.lock().unwrap();
        cache.get(key).cloned()
    }

    fn cache_put(&self, key: String, product: NormalizedProduct) {
        let mut cache = self.cache.lock().unwrap();
        if cache.len() >= self.cache_capacity {
            let evict: Vec<String> = cache
                .keys()
                .take(self.cache_capacity / 2)
                .cloned()
                .collect();
            for k in evict {
                cache.remove(&k);
            }
            log::debug!("normalizer cache trimmed to {} entries", cache.len());
        }
        cache.insert(key, product);
    }

    /// Normalize one product, consulting the cache first.
    pub fn normalize(&self, product_text: &str, price: Option<f64>) -> NormalizedProduct {
        let key = Self::cache_key(product_text, price);
        if let Some(hit) = self.cache_get(&key) {
            return hit;
        }

        let result = match self.try_backend(product_text, price) {
            Ok(product) => product,
            Err(err) => {
                if self.backend.is_some() {
                    log::warn!("normalization failed ({err}); using rule-based fallback");
                }
                rules::normalize_with_rules(product_text, &self.categories)
            }
        };

        self.cache_put(key, result.clone());
        result
    }

    /// Normalize a batch of `(text, price)` pairs.
    ///
    /// Cache hits short-circuit; the rest go to the backend in chunks of at
    /// most [`MAX_BATCH_SIZE`]. A failed chunk falls back to per-item
    /// normalization, which in turn falls back to rules.
    pub fn normalize_batch(&self, items: &[(String, Option<f64>)]) -> Vec<NormalizedProduct> {
        let mut results: Vec<Option<NormalizedProduct>> = vec![None; items.len()];
        let mut pending: Vec<usize> = Vec::new();

        for (i, (text, price)) in items.iter().enumerate() {
            match self.cache_get(&Self::cache_key(text, *price)) {
                Some(hit) => results[i] = Some(hit),
                None => pending.push(i),
            }
        }

        for chunk in pending.chunks(MAX_BATCH_SIZE) {
            let batch_ok = self.try_backend_batch(items, chunk, &mut results);
            if !batch_ok {
                for &i in chunk {
                    let (text, price) = &items[i];
                    results[i] = Some(self.normalize(text, *price));
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.expect("every batch slot filled"))
            .collect()
    }

    fn try_backend(&self, product_text: &str, price: Option<f64>) -> Result<NormalizedProduct> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| Error::NormalizerUnavailable("no backend configured".to_string()))?;

        let reply = backend.normalize_one(SYSTEM_PROMPT, &prompt::user_message(product_text, price))?;
        self.product_from_reply(&reply, product_text, BACKEND_CONFIDENCE)
    }

    /// Run one chunk through the backend's batch mode. Returns false when
    /// the chunk must be retried item by item.
    fn try_backend_batch(
        &self,
        items: &[(String, Option<f64>)],
        chunk: &[usize],
        results: &mut [Option<NormalizedProduct>],
    ) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let user_texts: Vec<String> = chunk
            .iter()
            .map(|&i| prompt::user_message(&items[i].0, items[i].1))
            .collect();

        let replies = match backend.normalize_many(SYSTEM_PROMPT, &user_texts) {
            Ok(replies) if replies.len() == chunk.len() => replies,
            Ok(replies) => {
                log::warn!(
                    "batch normalization replied {} items for {}; retrying per item",
                    replies.len(),
                    chunk.len()
                );
                return false;
            }
            Err(err) => {
                log::warn!("batch normalization failed ({err}); retrying per item");
                return false;
            }
        };

        for (&i, reply) in chunk.iter().zip(replies.iter()) {
            let (text, price) = &items[i];
            let product = match self.product_from_reply(reply, text, BACKEND_BATCH_CONFIDENCE) {
                Ok(product) => product,
                Err(_) => rules::normalize_with_rules(text, &self.categories),
            };
            self.cache_put(Self::cache_key(text, *price), product.clone());
            results[i] = Some(product);
        }
        true
    }

    /// Coerce a backend reply into a [`NormalizedProduct`].
    fn product_from_reply(
        &self,
        reply: &Value,
        product_text: &str,
        confidence: f64,
    ) -> Result<NormalizedProduct> {
        let obj = reply
            .as_object()
            .ok_or_else(|| Error::InvalidReply("reply is not a JSON object".to_string()))?;

        let string_field = |name: &str| -> Option<String> {
            obj.get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
                .map(str::to_string)
        };
        let float_field = |name: &str| -> Option<f64> {
            let value = obj.get(name)?;
            value
                .as_f64()
                .or_else(|| value.as_str()?.replace(',', ".").parse().ok())
        };
        let int_field = |name: &str| -> Option<u32> {
            let value = obj.get(name)?;
            value
                .as_u64()
                .map(|v| v as u32)
                .or_else(|| value.as_str()?.parse().ok())
        };

        Ok(NormalizedProduct {
            brand_norm: string_field("brand_norm"),
            product_norm: string_field("product_norm").or_else(|| Some(product_text.to_string())),
            variant_norm: string_field("variant_norm"),
            category: self
                .categories
                .validate(string_field("category").as_deref()),
            net_amount_value: float_field("net_amount_value"),
            net_amount_unit: string_field("net_amount_unit")
                .as_deref()
                .and_then(AmountUnit::parse),
            pack_count: int_field("pack_count"),
            container_type: string_field("container_type")
                .as_deref()
                .and_then(Container::parse),
            deposit_value: float_field("deposit_value"),
            comment: string_field("comment"),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        reply: Value,
        calls: Arc<AtomicUsize>,
    }

    impl NormalizeBackend for FixedBackend {
        fn normalize_one(&self, _system_prompt: &str, _user_text: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    impl NormalizeBackend for FailingBackend {
        fn normalize_one(&self, _system_prompt: &str, _user_text: &str) -> Result<Value> {
            Err(Error::NormalizerUnavailable("connection refused".to_string()))
        }
    }

    fn categories() -> Arc<CachedCategories> {
        Arc::new(CachedCategories::default())
    }

    fn cola_reply() -> Value {
        json!({
            "brand_norm": "Coca-Cola",
            "product_norm": "Cola",
            "variant_norm": "Zero",
            "category": "Drikkevarer",
            "net_amount_value": 330,
            "net_amount_unit": "ml",
            "pack_count": 6,
            "container_type": "CAN",
            "deposit_value": null,
            "comment": null
        })
    }

    #[test]
    fn test_backend_reply_is_coerced() {
        let normalizer = Normalizer::new(
            Some(Box::new(FixedBackend {
                reply: cola_reply(),
                calls: Arc::new(AtomicUsize::new(0)),
            })),
            categories(),
        );
        let result = normalizer.normalize("Coca-Cola Zero 6-pak 33 cl", Some(45.0));
        assert_eq!(result.brand_norm.as_deref(), Some("Coca-Cola"));
        assert_eq!(result.net_amount_unit, Some(AmountUnit::Ml));
        assert_eq!(result.container_type, Some(Container::Can));
        assert_eq!(result.pack_count, Some(6));
        assert_eq!(result.confidence, BACKEND_CONFIDENCE);
    }

    #[test]
    fn test_unknown_category_coerced_to_andet() {
        let normalizer = Normalizer::new(
            Some(Box::new(FixedBackend {
                reply: json!({"product_norm": "Ting", "category": "Opfundet kategori"}),
                calls: Arc::new(AtomicUsize::new(0)),
            })),
            categories(),
        );
        let result = normalizer.normalize("Ting", None);
        assert_eq!(result.category, "Andet");
    }

    #[test]
    fn test_unit_synonyms_coerced() {
        let normalizer = Normalizer::new(
            Some(Box::new(FixedBackend {
                reply: json!({
                    "product_norm": "Mælk",
                    "net_amount_value": 1,
                    "net_amount_unit": "liter"
                }),
                calls: Arc::new(AtomicUsize::new(0)),
            })),
            categories(),
        );
        let result = normalizer.normalize("Mælk 1 liter", None);
        assert_eq!(result.net_amount_unit, Some(AmountUnit::L));
    }

    #[test]
    fn test_failing_backend_falls_back_to_rules() {
        let normalizer = Normalizer::new(Some(Box::new(FailingBackend)), categories());
        let result = normalizer.normalize("Arla Letmælk 1 l", Some(15.0));
        assert_eq!(result.confidence, rules::RULES_CONFIDENCE);
        assert_eq!(result.product_norm.as_deref(), Some("Arla Letmælk 1 l"));
    }

    #[test]
    fn test_no_backend_uses_rules() {
        let normalizer = Normalizer::new(None, categories());
        let result = normalizer.normalize("Tuborg Classic 6 dåser", None);
        assert_eq!(result.confidence, rules::RULES_CONFIDENCE);
        assert_eq!(result.category, "Øl & Vin");
    }

    #[test]
    fn test_cache_short_circuits_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let normalizer = Normalizer::new(
            Some(Box::new(FixedBackend {
                reply: cola_reply(),
                calls: calls.clone(),
            })),
            categories(),
        );

        let first = normalizer.normalize("Coca-Cola Zero", Some(45.0));
        let second = normalizer.normalize("  coca-cola zero  ", Some(45.0));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A different price is a different cache key.
        normalizer.normalize("Coca-Cola Zero", Some(39.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_eviction_keeps_working() {
        let normalizer = Normalizer::new(None, categories()).with_cache_capacity(4);
        for i in 0..10 {
            normalizer.normalize(&format!("Produkt {i}"), None);
        }
        // Still coherent after eviction.
        let a = normalizer.normalize("Produkt 9", None);
        let b = normalizer.normalize("Produkt 9", None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_populates_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let normalizer = Normalizer::new(
            Some(Box::new(FixedBackend {
                reply: cola_reply(),
                calls: calls.clone(),
            })),
            categories(),
        );

        let items = vec![
            ("Coca-Cola Zero".to_string(), Some(45.0)),
            ("Coca-Cola Original".to_string(), Some(45.0)),
        ];
        let results = normalizer.normalize_batch(&items);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].confidence, BACKEND_BATCH_CONFIDENCE);

        // Both entries now come from the cache.
        normalizer.normalize("Coca-Cola Zero", Some(45.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_batch_without_backend_uses_rules() {
        let normalizer = Normalizer::new(None, categories());
        let items = vec![("Arla Letmælk".to_string(), None)];
        let results = normalizer.normalize_batch(&items);
        assert_eq!(results[0].confidence, rules::RULES_CONFIDENCE);
    }
}
