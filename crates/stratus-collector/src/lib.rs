//! stratus-collector — the scrape engine.
//!
//! One synchronous pass per scrape request: snapshot the active
//! configuration, resolve each rule's dimension combinations, fetch the
//! newest datapoint per combination, enrich with ownership tags, and build
//! the exposition families plus the scrape meta-metrics. No background
//! scheduler exists; a scrape is pulled by the HTTP layer and concurrent
//! scrapes may run in parallel.

mod builder;
mod dimensions;
mod family;
mod fetch;
mod scrape;
mod snapshot;

pub use family::{render_text, MetricFamily, MetricKind, Sample};
pub use scrape::{Collector, ScrapeError, DIMENSIONS_CACHE, METRICS_CACHE, TAGS_CACHE};
pub use snapshot::{ConfigSnapshot, SnapshotStore};
