//! Dimension discovery — which concrete series a rule expands to.

use std::sync::atomic::{AtomicU64, Ordering};

use stratus_cache::TtlCache;
use stratus_cloud::{CloudWatchClient, Dimension};
use stratus_core::MetricRule;

use crate::scrape::ScrapeError;

/// All dimension combinations the rule should query, discovered from the
/// provider's metric catalog and filtered by the rule's selection policy.
///
/// A rule without dimension names targets the namespace-level series: the
/// result is exactly one empty combination, recomputed freely. Discovery
/// failures propagate; a stale cached answer is worse than a failed scrape.
pub(crate) async fn resolve_dimensions(
    rule: &MetricRule,
    client: &dyn CloudWatchClient,
    cache: &TtlCache<String, Vec<Vec<Dimension>>>,
    requests_total: &AtomicU64,
) -> Result<Vec<Vec<Dimension>>, ScrapeError> {
    let key = format!("{}#{}", rule.namespace, rule.metric_name);
    if let Some(combinations) = cache.get(&key) {
        return Ok(combinations);
    }

    if rule.dimensions.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    let mut combinations = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let page = client
            .list_metrics(
                &rule.namespace,
                &rule.metric_name,
                &rule.dimensions,
                next_token,
            )
            .await
            .map_err(|source| ScrapeError::Discovery {
                namespace: rule.namespace.clone(),
                metric_name: rule.metric_name.clone(),
                source,
            })?;
        requests_total.fetch_add(1, Ordering::Relaxed);

        for metric in page.metrics {
            // The catalog returns series carrying supersets of the requested
            // dimensions; only exact arity matches belong to this rule.
            if metric.dimensions.len() != rule.dimensions.len() {
                continue;
            }
            let accepted = rule.select.matches(
                metric
                    .dimensions
                    .iter()
                    .map(|d| (d.name.as_str(), d.value.as_str())),
            );
            if accepted {
                combinations.push(metric.dimensions);
            }
        }

        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }

    cache.put(key, combinations.clone());
    Ok(combinations)
}
