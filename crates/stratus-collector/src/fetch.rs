//! Statistics retrieval — the newest datapoint per concrete series.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};

use stratus_cache::TtlCache;
use stratus_cloud::{newest_datapoint, CloudWatchClient, Datapoint, Dimension, StatisticsQuery};
use stratus_core::MetricRule;

use crate::scrape::ScrapeError;

/// The newest datapoint for one rule/dimension-combination, or `None` when
/// the series has no data in the query window.
///
/// The `None` outcome is cached as a first-class value: an empty series must
/// not re-trigger a provider call on every scrape within the TTL.
pub(crate) async fn fetch_statistics(
    rule: &MetricRule,
    dimensions: &[Dimension],
    client: &dyn CloudWatchClient,
    cache: &TtlCache<String, Option<Datapoint>>,
    requests_total: &AtomicU64,
) -> Result<Option<Datapoint>, ScrapeError> {
    let key = cache_key(rule, dimensions);
    if let Some(datapoint) = cache.get(&key) {
        return Ok(datapoint);
    }

    let now = Utc::now();
    let delay = Duration::seconds(rule.delay_seconds as i64);
    let range = Duration::seconds(rule.range_seconds as i64);
    let query = StatisticsQuery {
        namespace: rule.namespace.clone(),
        metric_name: rule.metric_name.clone(),
        dimensions: dimensions.to_vec(),
        statistics: rule
            .statistics
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        extended_statistics: rule.extended_statistics.clone(),
        period_seconds: rule.period_seconds,
        start_time: now - delay - range,
        end_time: now - delay,
    };

    let datapoints = client
        .get_metric_statistics(&query)
        .await
        .map_err(|source| ScrapeError::Fetch {
            namespace: rule.namespace.clone(),
            metric_name: rule.metric_name.clone(),
            source,
        })?;
    requests_total.fetch_add(1, Ordering::Relaxed);

    let newest = newest_datapoint(datapoints);
    cache.put(key, newest.clone());
    Ok(newest)
}

/// Key over everything that makes a query distinct: namespace, metric,
/// requested statistics, and the dimension pairs in the combination's order.
fn cache_key(rule: &MetricRule, dimensions: &[Dimension]) -> String {
    let mut key = format!("{}#{}", rule.namespace, rule.metric_name);
    for statistic in &rule.statistics {
        key.push('#');
        key.push_str(statistic.as_str());
    }
    for statistic in &rule.extended_statistics {
        key.push('#');
        key.push_str(statistic);
    }
    for dimension in dimensions {
        key.push_str(&dimension.name);
        key.push_str(&dimension.value);
    }
    key
}
