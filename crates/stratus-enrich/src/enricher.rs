//! Cache-backed enrichment of sample label sets.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use stratus_cache::{CacheStats, TtlCache};
use stratus_core::naming::{safe_name, snake_case};
use stratus_core::ResourceMapping;

use crate::tags::{default_tag_set, extract_tags, TagSet};
use crate::{LookupResult, TagIndex};

const CACHE_MAX_ENTRIES: usize = 100_000;
const CACHE_TTL: Duration = Duration::from_secs(6 * 3600);

/// Network load balancer identifiers arrive as `net/<name>/<suffix>`; the
/// index knows them by bare `<name>`.
const NLB_PREFIX: &str = "net/";

/// Joins a resource identity to its tag labels, caching index responses.
pub struct TagEnricher {
    index: Arc<dyn TagIndex>,
    cache: TtlCache<String, TagSet>,
}

impl TagEnricher {
    pub fn new(index: Arc<dyn TagIndex>) -> Self {
        Self {
            index,
            cache: TtlCache::new(CACHE_MAX_ENTRIES, CACHE_TTL),
        }
    }

    /// Statistics of the tags cache tier.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Append the mapping's tag labels to a sample's in-progress label set.
    ///
    /// Never fails: any lookup problem appends the fully-sentineled default
    /// set instead.
    pub async fn enrich(&self, mapping: &ResourceMapping, labels: &mut Vec<(String, String)>) {
        let resource_name = find_resource_name(mapping, labels);
        let tags = self.tags_for(mapping, &resource_name).await;
        for (name, value) in tags {
            labels.push((safe_name(&snake_case(&name)), value));
        }
    }

    async fn tags_for(&self, mapping: &ResourceMapping, resource_name: &str) -> TagSet {
        if resource_name.is_empty() || mapping.lookup_url.is_empty() {
            warn!(
                namespace = %mapping.namespace,
                id_field = %mapping.id_field,
                "resource identity not found in sample labels"
            );
            return default_tag_set(&mapping.additional_labels);
        }

        let key = format!(
            "{}#{}#{}",
            mapping.es_id_field, resource_name, mapping.lookup_url
        );
        if let Some(tags) = self.cache.get(&key) {
            return tags;
        }

        match self
            .index
            .lookup(&mapping.es_id_field, resource_name, &mapping.lookup_url)
            .await
        {
            Ok(LookupResult::Unique(source)) => {
                let tags = extract_tags(&source, &mapping.additional_labels);
                self.cache.put(key, tags.clone());
                tags
            }
            Ok(LookupResult::NotFound) => {
                warn!(
                    resource_name,
                    namespace = %mapping.namespace,
                    "no metadata-index document for resource"
                );
                let tags = default_tag_set(&mapping.additional_labels);
                self.cache.put(key, tags.clone());
                tags
            }
            Ok(LookupResult::Ambiguous(count)) => {
                warn!(
                    resource_name,
                    namespace = %mapping.namespace,
                    count,
                    "ambiguous metadata-index match for resource"
                );
                let tags = default_tag_set(&mapping.additional_labels);
                self.cache.put(key, tags.clone());
                tags
            }
            // Transport failures are transient; degrade without caching so
            // the next scrape retries.
            Err(error) => {
                warn!(
                    resource_name,
                    namespace = %mapping.namespace,
                    %error,
                    "metadata-index lookup failed"
                );
                default_tag_set(&mapping.additional_labels)
            }
        }
    }
}

/// Find the label carrying the mapping's resource identifier and return its
/// value, rewriting compound load-balancer identifiers to the bare name in
/// place.
fn find_resource_name(mapping: &ResourceMapping, labels: &mut Vec<(String, String)>) -> String {
    let wanted = safe_name(&snake_case(&mapping.id_field));
    let mut resource_name = String::new();
    for (name, value) in labels.iter_mut() {
        if name.eq_ignore_ascii_case(&wanted) {
            if let Some(rest) = value.strip_prefix(NLB_PREFIX) {
                let bare = match rest.find('/') {
                    Some(end) => &rest[..end],
                    None => rest,
                };
                *value = bare.to_string();
            }
            resource_name = value.clone();
        }
    }
    resource_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::SENTINEL;
    use crate::EnrichError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn mapping() -> ResourceMapping {
        ResourceMapping {
            namespace: "AWS/ELB".to_string(),
            id_field: "LoadBalancerName".to_string(),
            es_id_field: "loadbalancername".to_string(),
            lookup_url: "https://index.example.com/aws/classicelb/_search".to_string(),
            additional_labels: Vec::new(),
        }
    }

    struct FixedIndex {
        result: fn() -> Result<LookupResult, EnrichError>,
        calls: AtomicU64,
    }

    #[async_trait]
    impl TagIndex for FixedIndex {
        async fn lookup(
            &self,
            _field: &str,
            _value: &str,
            _lookup_url: &str,
        ) -> Result<LookupResult, EnrichError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn enricher_with(result: fn() -> Result<LookupResult, EnrichError>) -> (TagEnricher, Arc<FixedIndex>) {
        let index = Arc::new(FixedIndex {
            result,
            calls: AtomicU64::new(0),
        });
        (TagEnricher::new(index.clone()), index)
    }

    fn base_labels() -> Vec<(String, String)> {
        vec![
            ("job".to_string(), "aws_elb".to_string()),
            ("instance".to_string(), String::new()),
            ("load_balancer_name".to_string(), "my-lb".to_string()),
        ]
    }

    #[tokio::test]
    async fn unique_hit_appends_extracted_tags() {
        let (enricher, _) = enricher_with(|| {
            let source = serde_json::json!({"tags.Environment": "prod"});
            Ok(LookupResult::Unique(source.as_object().unwrap().clone()))
        });

        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;

        assert!(labels.contains(&("environment".to_string(), "prod".to_string())));
        assert!(labels.contains(&("stack".to_string(), SENTINEL.to_string())));
        assert!(labels.contains(&("work_load".to_string(), SENTINEL.to_string())));
        assert!(labels.contains(&("accountname".to_string(), SENTINEL.to_string())));
        // 3 base labels + 7 vocabulary tags.
        assert_eq!(labels.len(), 10);
    }

    #[tokio::test]
    async fn transport_failure_yields_full_sentinel_set() {
        let (enricher, index) = enricher_with(|| {
            Err(EnrichError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            })
        });

        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;
        assert_eq!(labels.len(), 10);
        assert!(labels.contains(&("environment".to_string(), SENTINEL.to_string())));

        // Failures are not cached; the next call hits the index again.
        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;
        assert_eq!(index.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unique_hit_is_cached() {
        let (enricher, index) = enricher_with(|| {
            Ok(LookupResult::Unique(serde_json::Map::new()))
        });

        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;
        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;

        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
        assert_eq!(enricher.cache_stats().hit_count, 1);
    }

    #[tokio::test]
    async fn ambiguous_match_is_sentineled_and_cached() {
        let (enricher, index) = enricher_with(|| Ok(LookupResult::Ambiguous(2)));

        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;
        assert!(labels.contains(&("role".to_string(), SENTINEL.to_string())));

        let mut labels = base_labels();
        enricher.enrich(&mapping(), &mut labels).await;
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_identity_label_skips_lookup() {
        let (enricher, index) = enricher_with(|| Ok(LookupResult::NotFound));

        let mut labels = vec![("job".to_string(), "aws_elb".to_string())];
        enricher.enrich(&mapping(), &mut labels).await;

        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        // Sentinel set still appended.
        assert!(labels.contains(&("environment".to_string(), SENTINEL.to_string())));
    }

    #[tokio::test]
    async fn network_lb_identifier_rewritten_in_place() {
        let (enricher, _) = enricher_with(|| Ok(LookupResult::NotFound));

        let mut labels = vec![(
            "load_balancer_name".to_string(),
            "net/my-lb/abcd".to_string(),
        )];
        enricher.enrich(&mapping(), &mut labels).await;

        assert_eq!(labels[0].1, "my-lb");
    }

    #[tokio::test]
    async fn identity_match_is_case_insensitive() {
        let (enricher, index) = enricher_with(|| Ok(LookupResult::NotFound));

        let mut labels = vec![(
            "Load_Balancer_Name".to_string(),
            "my-lb".to_string(),
        )];
        enricher.enrich(&mapping(), &mut labels).await;
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn additional_labels_included_in_sentinel_set() {
        let (enricher, _) = enricher_with(|| Ok(LookupResult::NotFound));

        let mut m = mapping();
        m.additional_labels = vec!["CostCenter".to_string()];
        let mut labels = base_labels();
        enricher.enrich(&m, &mut labels).await;

        assert!(labels.contains(&("cost_center".to_string(), SENTINEL.to_string())));
        assert_eq!(labels.len(), 11);
    }
}
