//! The atomically swappable configuration snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;

use stratus_cloud::CloudWatchClient;
use stratus_core::ExporterConfig;

/// The unit a scrape observes for its whole duration: rule set, mappings,
/// and the provider client handle, all from the same load.
pub struct ConfigSnapshot {
    pub config: ExporterConfig,
    pub client: Arc<dyn CloudWatchClient>,
}

/// Holds the active snapshot. `swap` is a single pointer replacement, so a
/// concurrent scrape sees either the old or the new snapshot in full, never
/// a mix; the old snapshot is dropped once the last in-flight scrape
/// releases its reference.
pub struct SnapshotStore {
    active: ArcSwap<ConfigSnapshot>,
}

impl SnapshotStore {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            active: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The active snapshot; callers hold the returned reference for the
    /// duration of one scrape.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.active.load_full()
    }

    /// Install a freshly validated rule set, keeping the existing provider
    /// client handle.
    pub fn swap_config(&self, config: ExporterConfig) {
        let client = self.current().client.clone();
        self.active.store(Arc::new(ConfigSnapshot { config, client }));
    }
}
