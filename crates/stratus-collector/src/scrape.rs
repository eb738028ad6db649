//! The scrape orchestrator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use stratus_cache::{CacheStats, TtlCache};
use stratus_cloud::{CloudError, CloudWatchClient, Datapoint, Dimension};
use stratus_core::naming::{safe_name, snake_case};
use stratus_core::ExporterConfig;
use stratus_enrich::{TagEnricher, TagIndex};

use crate::builder::RuleSamples;
use crate::dimensions::resolve_dimensions;
use crate::family::{MetricFamily, MetricKind, Sample};
use crate::fetch::fetch_statistics;
use crate::snapshot::{ConfigSnapshot, SnapshotStore};

/// Cache tier names, as exposed through the cache meta-metrics.
pub const DIMENSIONS_CACHE: &str = "dimensions";
pub const METRICS_CACHE: &str = "metrics";
pub const TAGS_CACHE: &str = "tags";

// Tier sizing. Discovery is expensive and changes slowly; statistics must
// stay fresher than the scrape cadence.
const DIMENSIONS_CACHE_ENTRIES: usize = 500;
const DIMENSIONS_CACHE_TTL: Duration = Duration::from_secs(4 * 3600);
const METRICS_CACHE_ENTRIES: usize = 1_000_000;
const METRICS_CACHE_TTL: Duration = Duration::from_secs(2 * 60);

/// A provider failure that aborts the remainder of one scrape pass.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("dimension discovery for {namespace}/{metric_name} failed: {source}")]
    Discovery {
        namespace: String,
        metric_name: String,
        source: CloudError,
    },

    #[error("statistics fetch for {namespace}/{metric_name} failed: {source}")]
    Fetch {
        namespace: String,
        metric_name: String,
        source: CloudError,
    },
}

/// Per-scrape coordinator over the active configuration snapshot.
pub struct Collector {
    store: SnapshotStore,
    dimensions_cache: TtlCache<String, Vec<Vec<Dimension>>>,
    metrics_cache: TtlCache<String, Option<Datapoint>>,
    enricher: TagEnricher,
    requests_total: AtomicU64,
}

impl Collector {
    pub fn new(
        config: ExporterConfig,
        client: Arc<dyn CloudWatchClient>,
        index: Arc<dyn TagIndex>,
    ) -> Self {
        Self {
            store: SnapshotStore::new(ConfigSnapshot { config, client }),
            dimensions_cache: TtlCache::new(DIMENSIONS_CACHE_ENTRIES, DIMENSIONS_CACHE_TTL),
            metrics_cache: TtlCache::new(METRICS_CACHE_ENTRIES, METRICS_CACHE_TTL),
            enricher: TagEnricher::new(index),
            requests_total: AtomicU64::new(0),
        }
    }

    /// Install a freshly validated rule set, keeping the provider client.
    /// Callers only reach this after a successful load; a failed load leaves
    /// the active snapshot untouched.
    pub fn apply_config(&self, config: ExporterConfig) {
        self.store.swap_config(config);
    }

    /// Provider calls made since startup.
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Run one scrape pass and return the full exposition snapshot.
    ///
    /// Never fails: a provider error aborts the remaining rules, keeps the
    /// families already built, and surfaces through the scrape-error gauge.
    pub async fn collect(&self, namespace_filter: Option<&str>) -> Vec<MetricFamily> {
        let start = Instant::now();
        let snapshot = self.store.current();

        let mut families = Vec::new();
        let mut error_flag = 0.0;
        if let Err(err) = self
            .scrape(&snapshot, namespace_filter, &mut families)
            .await
        {
            error_flag = 1.0;
            error!(error = %err, "scrape pass aborted");
        }

        let duration = start.elapsed();
        debug!(
            requests_total = self.requests_total(),
            duration_ms = duration.as_millis() as u64,
            "scrape pass finished"
        );
        self.append_meta_families(&mut families, duration.as_secs_f64(), error_flag);
        families
    }

    async fn scrape(
        &self,
        snapshot: &ConfigSnapshot,
        namespace_filter: Option<&str>,
        families: &mut Vec<MetricFamily>,
    ) -> Result<(), ScrapeError> {
        for rule in &snapshot.config.rules {
            if let Some(filter) = namespace_filter {
                if !rule.namespace.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }

            let combinations = resolve_dimensions(
                rule,
                snapshot.client.as_ref(),
                &self.dimensions_cache,
                &self.requests_total,
            )
            .await?;

            let job = safe_name(&rule.namespace.to_lowercase());
            let mut samples = RuleSamples::new(rule);
            for dimensions in combinations {
                let datapoint = fetch_statistics(
                    rule,
                    &dimensions,
                    snapshot.client.as_ref(),
                    &self.metrics_cache,
                    &self.requests_total,
                )
                .await?;
                let Some(datapoint) = datapoint else {
                    continue;
                };

                let mut labels = vec![
                    ("job".to_string(), job.clone()),
                    ("instance".to_string(), String::new()),
                ];
                for dimension in &dimensions {
                    labels.push((
                        safe_name(&snake_case(&dimension.name)),
                        dimension.value.clone(),
                    ));
                }
                match snapshot.config.mappings.get(&rule.namespace) {
                    Some(mapping) => self.enricher.enrich(mapping, &mut labels).await,
                    None => warn!(
                        namespace = %rule.namespace,
                        "no resource mapping configured for namespace"
                    ),
                }

                samples.record(&datapoint, labels);
            }
            families.extend(samples.into_families(rule));
        }
        Ok(())
    }

    fn cache_stats(&self) -> [(&'static str, CacheStats); 3] {
        [
            (DIMENSIONS_CACHE, self.dimensions_cache.stats()),
            (METRICS_CACHE, self.metrics_cache.stats()),
            (TAGS_CACHE, self.enricher.cache_stats()),
        ]
    }

    /// The meta-families every scrape carries, degraded or not: duration,
    /// error flag, and the per-cache gauges/counters.
    fn append_meta_families(
        &self,
        families: &mut Vec<MetricFamily>,
        duration_seconds: f64,
        error_flag: f64,
    ) {
        families.push(MetricFamily {
            name: "cloudwatch_exporter_scrape_duration_seconds".to_string(),
            help: "Time this CloudWatch scrape took, in seconds.".to_string(),
            kind: MetricKind::Gauge,
            samples: vec![Sample {
                labels: Vec::new(),
                value: duration_seconds,
            }],
        });
        families.push(MetricFamily {
            name: "cloudwatch_exporter_scrape_error".to_string(),
            help: "Non-zero if this scrape failed.".to_string(),
            kind: MetricKind::Gauge,
            samples: vec![Sample {
                labels: Vec::new(),
                value: error_flag,
            }],
        });

        let stats = self.cache_stats();
        let per_cache = |value: fn(&CacheStats) -> f64| -> Vec<Sample> {
            stats
                .iter()
                .map(|(name, s)| Sample {
                    labels: vec![("cache_name".to_string(), name.to_string())],
                    value: value(s),
                })
                .collect()
        };

        families.push(MetricFamily {
            name: "cloudwatch_exporter_cache_usage".to_string(),
            help: "Entries held by each cache.".to_string(),
            kind: MetricKind::Gauge,
            samples: per_cache(|s| s.size as f64),
        });
        families.push(MetricFamily {
            name: "cloudwatch_exporter_cache_hitratio".to_string(),
            help: "Cache hit ratio.".to_string(),
            kind: MetricKind::Gauge,
            samples: per_cache(|s| s.hit_ratio),
        });
        families.push(MetricFamily {
            name: "cloudwatch_exporter_cache_hitcount".to_string(),
            help: "Cache hit count.".to_string(),
            kind: MetricKind::Counter,
            samples: per_cache(|s| s.hit_count as f64),
        });
        families.push(MetricFamily {
            name: "cloudwatch_exporter_cache_misscount".to_string(),
            help: "Cache miss count.".to_string(),
            kind: MetricKind::Counter,
            samples: per_cache(|s| s.miss_count as f64),
        });
    }
}
