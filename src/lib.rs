// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod source;
pub mod store;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::filter::{accept, evaluate, FilterSpec, FilterVerdict};
pub use crate::model::{Candidate, JobListing};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::source::types::SourceAdapter;
pub use crate::store::{SeenSet, SeenStore};
pub use crate::watcher::{RunSummary, WatchError, WatchedSource, Watcher};

use std::sync::Arc;

use crate::config::WatchConfig;
use crate::source::driver::PageDriver;

/// Wire every enabled source in `cfg` to `driver`, each with its effective filter.
pub fn watched_sources(cfg: &WatchConfig, driver: Arc<dyn PageDriver>) -> Vec<WatchedSource> {
    let enabled: Vec<_> = cfg.enabled_sources().cloned().collect();
    source::build_sources(&enabled, &cfg.browser, driver)
        .into_iter()
        .zip(enabled.iter())
        .map(|(adapter, sc)| WatchedSource::new(Box::new(adapter), cfg.filter_for(sc).clone()))
        .collect()
}
