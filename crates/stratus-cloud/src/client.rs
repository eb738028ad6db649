//! Provider client trait and the REST implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{epoch_seconds, Datapoint, Dimension, MetricsPage, StatisticsQuery};

const TARGET_PREFIX: &str = "GraniteServiceVersion20100801";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from provider calls. Never retried here; the scrape orchestrator
/// decides what a failed call means for the pass.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// The two provider calls the scrape engine consumes.
#[async_trait]
pub trait CloudWatchClient: Send + Sync {
    /// One page of the metric catalog for `namespace`/`metric_name`,
    /// restricted to series carrying the named dimensions.
    async fn list_metrics(
        &self,
        namespace: &str,
        metric_name: &str,
        dimension_filters: &[String],
        next_token: Option<String>,
    ) -> Result<MetricsPage, CloudError>;

    /// Datapoints for one concrete dimension combination over the query
    /// window.
    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<Datapoint>, CloudError>;
}

/// REST client for CloudWatch-compatible JSON-protocol endpoints.
///
/// Requests are unsigned; deployments that talk to the real provider put a
/// signing proxy in front of it or point `endpoint` at a compatible gateway.
pub struct RestClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RestClient {
    /// Client for the given provider region.
    pub fn new(region: &str) -> Result<Self, CloudError> {
        Self::with_endpoint(monitoring_endpoint(region))
    }

    /// Client for an explicit endpoint, e.g. a local gateway.
    pub fn with_endpoint(endpoint: String) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self { http, endpoint })
    }

    async fn call<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<R, CloudError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/x-amz-json-1.0")
            .header("x-amz-target", format!("{TARGET_PREFIX}.{action}"))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CloudError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

/// Monitoring endpoint for a provider region.
pub(crate) fn monitoring_endpoint(region: &str) -> String {
    format!("https://monitoring.{region}.amazonaws.com")
}

#[derive(Serialize)]
struct DimensionFilter<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
}

#[derive(Serialize)]
struct ListMetricsRequest<'a> {
    #[serde(rename = "Namespace")]
    namespace: &'a str,
    #[serde(rename = "MetricName")]
    metric_name: &'a str,
    #[serde(rename = "Dimensions", skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<DimensionFilter<'a>>,
    #[serde(rename = "NextToken", skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Serialize)]
struct GetMetricStatisticsRequest<'a> {
    #[serde(rename = "Namespace")]
    namespace: &'a str,
    #[serde(rename = "MetricName")]
    metric_name: &'a str,
    #[serde(rename = "Dimensions")]
    dimensions: &'a [Dimension],
    #[serde(rename = "StartTime", with = "epoch_seconds")]
    start_time: DateTime<Utc>,
    #[serde(rename = "EndTime", with = "epoch_seconds")]
    end_time: DateTime<Utc>,
    #[serde(rename = "Period")]
    period: u64,
    #[serde(rename = "Statistics", skip_serializing_if = "<[_]>::is_empty")]
    statistics: &'a [String],
    #[serde(rename = "ExtendedStatistics", skip_serializing_if = "<[_]>::is_empty")]
    extended_statistics: &'a [String],
}

#[derive(Deserialize)]
struct GetMetricStatisticsResponse {
    #[serde(rename = "Datapoints", default)]
    datapoints: Vec<Datapoint>,
}

#[async_trait]
impl CloudWatchClient for RestClient {
    async fn list_metrics(
        &self,
        namespace: &str,
        metric_name: &str,
        dimension_filters: &[String],
        next_token: Option<String>,
    ) -> Result<MetricsPage, CloudError> {
        debug!(namespace, metric_name, "listing metric catalog page");
        let request = ListMetricsRequest {
            namespace,
            metric_name,
            dimensions: dimension_filters
                .iter()
                .map(|name| DimensionFilter { name })
                .collect(),
            next_token: next_token.as_deref(),
        };
        self.call("ListMetrics", &request).await
    }

    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<Datapoint>, CloudError> {
        debug!(
            namespace = %query.namespace,
            metric_name = %query.metric_name,
            dimensions = query.dimensions.len(),
            "fetching statistics"
        );
        let request = GetMetricStatisticsRequest {
            namespace: &query.namespace,
            metric_name: &query.metric_name,
            dimensions: &query.dimensions,
            start_time: query.start_time,
            end_time: query.end_time,
            period: query.period_seconds,
            statistics: &query.statistics,
            extended_statistics: &query.extended_statistics,
        };
        let response: GetMetricStatisticsResponse =
            self.call("GetMetricStatistics", &request).await?;
        Ok(response.datapoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn region_endpoint() {
        assert_eq!(
            monitoring_endpoint("eu-west-1"),
            "https://monitoring.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn list_metrics_request_shape() {
        let request = ListMetricsRequest {
            namespace: "AWS/ELB",
            metric_name: "RequestCount",
            dimensions: vec![DimensionFilter {
                name: "LoadBalancerName",
            }],
            next_token: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Namespace": "AWS/ELB",
                "MetricName": "RequestCount",
                "Dimensions": [{"Name": "LoadBalancerName"}],
            })
        );
    }

    #[test]
    fn statistics_request_omits_empty_lists() {
        let request = GetMetricStatisticsRequest {
            namespace: "AWS/ELB",
            metric_name: "Latency",
            dimensions: &[],
            start_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            end_time: Utc.timestamp_opt(1_700_000_060, 0).unwrap(),
            period: 60,
            statistics: &[],
            extended_statistics: &["p99".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("Statistics").is_none());
        assert_eq!(json["ExtendedStatistics"], serde_json::json!(["p99"]));
        assert_eq!(json["StartTime"], serde_json::json!(1_700_000_000.0));
    }

    #[test]
    fn metrics_page_decodes() {
        let page: MetricsPage = serde_json::from_str(
            r#"{
                "Metrics": [
                    {"Namespace": "AWS/ELB", "MetricName": "RequestCount",
                     "Dimensions": [{"Name": "LoadBalancerName", "Value": "my-lb"}]}
                ],
                "NextToken": "abc"
            }"#,
        )
        .unwrap();
        assert_eq!(page.metrics.len(), 1);
        assert_eq!(page.metrics[0].dimensions[0].value, "my-lb");
        assert_eq!(page.next_token.as_deref(), Some("abc"));
    }
}
