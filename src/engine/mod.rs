//! Core engine: the fetch → normalize → screen → act loop.

pub mod pipeline;
pub mod analyzer;
pub mod poller;

use std::sync::Arc;

use crate::activity::ActivityLog;
use crate::storage::blacklist::BlacklistRegistry;
use crate::storage::metrics::MetricsStore;
use crate::storage::SettingsStore;

/// Process-wide shared state, injected into each engine component at
/// construction.
#[derive(Clone)]
pub struct ScreenerContext {
    pub settings: Arc<SettingsStore>,
    pub blacklist: BlacklistRegistry,
    pub metrics: Arc<dyn MetricsStore>,
    pub activity: Arc<ActivityLog>,
}

impl ScreenerContext {
    pub fn new(
        settings: Arc<SettingsStore>,
        metrics: Arc<dyn MetricsStore>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            blacklist: BlacklistRegistry::new(Arc::clone(&settings)),
            settings,
            metrics,
            activity,
        }
    }
}
