//! Elasticsearch-proxy implementation of the metadata-index interface.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{EnrichError, LookupResult, TagIndex};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Metadata-index client for an Elasticsearch search endpoint (or a console
/// proxy in front of one).
pub struct EsTagIndex {
    http: reqwest::Client,
}

impl EsTagIndex {
    pub fn new() -> Result<Self, EnrichError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

/// Term query over the keyword sub-field, restricted to the latest document
/// generation. Size 2 is enough to tell "unique" from "ambiguous".
fn build_query(field: &str, value: &str) -> serde_json::Value {
    serde_json::json!({
        "size": "2",
        "query": {
            "bool": {
                "must": [
                    {"term": {(format!("{}.keyword", field.to_lowercase())): value}},
                    {"match": {"latest": true}}
                ]
            }
        }
    })
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    total: TotalCount,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// ES 6 reports a plain integer, ES 7+ an object with a `value` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalCount {
    Plain(u64),
    Object { value: u64 },
}

impl TotalCount {
    fn value(&self) -> u64 {
        match self {
            TotalCount::Plain(v) | TotalCount::Object { value: v } => *v,
        }
    }
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl TagIndex for EsTagIndex {
    async fn lookup(
        &self,
        field: &str,
        value: &str,
        lookup_url: &str,
    ) -> Result<LookupResult, EnrichError> {
        debug!(field, value, lookup_url, "querying metadata index");
        let response = self
            .http
            .post(lookup_url)
            .header("kbn-xsrf", "1")
            .json(&build_query(field, value))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response.json().await?;
        match body.hits.total.value() {
            0 => Ok(LookupResult::NotFound),
            1 => match body.hits.hits.into_iter().next() {
                Some(hit) => Ok(LookupResult::Unique(hit.source)),
                None => Ok(LookupResult::NotFound),
            },
            n => Ok(LookupResult::Ambiguous(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_shape_matches_index_contract() {
        let query = build_query("LoadBalancerName", "my-lb");
        assert_eq!(
            query,
            serde_json::json!({
                "size": "2",
                "query": {
                    "bool": {
                        "must": [
                            {"term": {"loadbalancername.keyword": "my-lb"}},
                            {"match": {"latest": true}}
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn response_total_plain_and_object() {
        let plain: SearchResponse =
            serde_json::from_str(r#"{"hits": {"total": 1, "hits": [{"_source": {"a": "b"}}]}}"#)
                .unwrap();
        assert_eq!(plain.hits.total.value(), 1);

        let object: SearchResponse =
            serde_json::from_str(r#"{"hits": {"total": {"value": 3}, "hits": []}}"#).unwrap();
        assert_eq!(object.hits.total.value(), 3);
    }
}
