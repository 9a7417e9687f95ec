//! The normalizer backend seam.
//!
//! A backend turns a system prompt plus a product description into a JSON
//! object with the normalized fields. Authentication, endpoint selection
//! and timeouts are the implementation's concern; the pipeline only sees
//! JSON values or an error it recovers from with the rule-based fallback.

use crate::error::Result;

/// A language-model (or equivalent) normalization backend.
pub trait NormalizeBackend: Send + Sync {
    /// Normalize a single product. The reply must be a JSON object with
    /// the normalized-product fields.
    fn normalize_one(&self, system_prompt: &str, user_text: &str) -> Result<serde_json::Value>;

    /// Normalize several products in one call, replying in input order.
    ///
    /// The default implementation loops over [`NormalizeBackend::normalize_one`];
    /// backends with a real batch mode should override it.
    fn normalize_many(
        &self,
        system_prompt: &str,
        user_texts: &[String],
    ) -> Result<Vec<serde_json::Value>> {
        user_texts
            .iter()
            .map(|text| self.normalize_one(system_prompt, text))
            .collect()
    }
}
