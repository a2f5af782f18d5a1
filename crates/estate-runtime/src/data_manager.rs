//! Memoized dataset for the runtime.
//!
//! [`DatasetCache`] owns the [`AnalysisConfig`] and loads the dataset on
//! first use. Later calls share the same `Arc<Dataset>` until a forced
//! reload or [`DatasetCache::invalidate`]. A failed reload keeps serving
//! the previous dataset.

use std::sync::Arc;
use std::time::{Duration, Instant};

use estate_core::settings::AnalysisConfig;
use estate_core::Result;
use estate_data::analysis::{load_dataset, Dataset};

/// Explicit, caller-owned dataset cache.
pub struct DatasetCache {
    config: AnalysisConfig,
    /// Most recently loaded dataset.
    cache: Option<Arc<Dataset>>,
    /// When the cache was last populated.
    cache_timestamp: Option<Instant>,
    /// Description of the last load error.
    last_error: Option<String>,
}

impl DatasetCache {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            cache: None,
            cache_timestamp: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Return the cached dataset, loading it when absent or when
    /// `force_reload` is set.
    ///
    /// Fails only when loading fails and nothing was cached before.
    pub fn get(&mut self, force_reload: bool) -> Result<Arc<Dataset>> {
        if !force_reload {
            if let Some(dataset) = &self.cache {
                tracing::debug!("returning cached dataset");
                return Ok(Arc::clone(dataset));
            }
        }

        match load_dataset(&self.config) {
            Ok(dataset) => {
                tracing::debug!(rows = dataset.deals.len(), "dataset cache updated");
                let dataset = Arc::new(dataset);
                self.cache = Some(Arc::clone(&dataset));
                self.cache_timestamp = Some(Instant::now());
                self.last_error = None;
                Ok(dataset)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                match &self.cache {
                    Some(previous) => {
                        tracing::warn!(error = %e, "reload failed; keeping previous dataset");
                        Ok(Arc::clone(previous))
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Drop the cached dataset so the next [`get`](Self::get) loads again.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        tracing::debug!("dataset cache invalidated");
    }

    /// Age of the cached dataset, `None` before the first load.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::settings::DEFAULT_DEALS_FILE;
    use std::thread;

    const DEALS: &str = "거래일,거래금액,층,전용면적,법정동\n2020-01-05,\"10,000\",3,59.9,서울특별시\n";

    fn make_cache_with_dir() -> (DatasetCache, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join(DEFAULT_DEALS_FILE), DEALS).expect("write deals");
        let config = AnalysisConfig::new(dir.path()).expect("config");
        (DatasetCache::new(config), dir)
    }

    // ── first load ────────────────────────────────────────────────────────

    #[test]
    fn test_cache_empty_before_first_get() {
        let (cache, _dir) = make_cache_with_dir();
        assert!(cache.cache_age().is_none());
        assert!(cache.last_error().is_none());
    }

    #[test]
    fn test_get_loads_then_reuses() {
        let (mut cache, _dir) = make_cache_with_dir();

        let first = cache.get(false).expect("first load");
        assert_eq!(first.deals.len(), 1);

        let second = cache.get(false).expect("cached");
        assert!(Arc::ptr_eq(&first, &second));

        let age = cache.cache_age().expect("age after load");
        assert!(age < Duration::from_secs(5));
    }

    #[test]
    fn test_first_load_failure_is_error() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let mut cache = DatasetCache::new(AnalysisConfig::new(dir.path()).expect("config"));

        assert!(cache.get(false).is_err());
        assert!(cache.last_error().is_some());
        assert!(cache.cache_age().is_none());
    }

    // ── reload ────────────────────────────────────────────────────────────

    #[test]
    fn test_force_reload_replaces_dataset() {
        let (mut cache, dir) = make_cache_with_dir();
        let first = cache.get(false).expect("first load");

        thread::sleep(Duration::from_millis(10));
        std::fs::write(
            dir.path().join(DEFAULT_DEALS_FILE),
            format!("{DEALS}2020-01-06,\"20,000\",5,84.9,부산광역시\n"),
        )
        .expect("rewrite deals");

        let reloaded = cache.get(true).expect("reload");
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.deals.len(), 2);
    }

    #[test]
    fn test_failed_reload_keeps_previous() {
        let (mut cache, dir) = make_cache_with_dir();
        let first = cache.get(false).expect("first load");

        std::fs::remove_file(dir.path().join(DEFAULT_DEALS_FILE)).expect("remove deals");

        let after = cache.get(true).expect("falls back to previous");
        assert!(Arc::ptr_eq(&first, &after));
        assert!(cache.last_error().unwrap().contains(DEFAULT_DEALS_FILE));
    }

    #[test]
    fn test_invalidate() {
        let (mut cache, _dir) = make_cache_with_dir();
        cache.get(false).expect("load");

        cache.invalidate();
        assert!(cache.cache_age().is_none());

        let again = cache.get(false).expect("reload after invalidate");
        assert_eq!(again.deals.len(), 1);
    }
}
