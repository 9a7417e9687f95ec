//! Scanner configuration.

use chrono::NaiveDate;

/// Configuration for a [`crate::scanner::Scanner`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Restrict scanning to an inclusive 1-based page range.
    pub page_range: Option<(u32, u32)>,

    /// Emit the `candidates` field on every offer so reviewers can see the
    /// readings the pipeline chose between.
    pub learning_mode: bool,

    /// Reference date for validity detection ("current year"). Defaults to
    /// today; fix it to make scans reproducible.
    pub reference_date: Option<NaiveDate>,

    /// Normalizer cache capacity.
    pub cache_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            page_range: None,
            learning_mode: false,
            reference_date: None,
            cache_capacity: crate::normalize::DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Scan only pages `from..=to` (1-based).
    pub fn with_page_range(mut self, from: u32, to: u32) -> Self {
        self.page_range = Some((from, to));
        self
    }

    /// Enable learning mode.
    pub fn with_learning_mode(mut self, enable: bool) -> Self {
        self.learning_mode = enable;
        self
    }

    /// Fix the reference date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Override the normalizer cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
