//! Wire types shared by every provider implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A name/value pair qualifying a metric to a specific resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One catalog entry returned by metric listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Metric {
    #[serde(rename = "Namespace", default)]
    pub namespace: Option<String>,
    #[serde(rename = "MetricName", default)]
    pub metric_name: Option<String>,
    #[serde(rename = "Dimensions", default)]
    pub dimensions: Vec<Dimension>,
}

/// One page of the metric catalog plus its continuation token.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsPage {
    #[serde(rename = "Metrics", default)]
    pub metrics: Vec<Metric>,
    #[serde(rename = "NextToken", default)]
    pub next_token: Option<String>,
}

/// One aggregated observation for a metric over a period.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Datapoint {
    #[serde(rename = "Timestamp", with = "epoch_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "Sum", default)]
    pub sum: Option<f64>,
    #[serde(rename = "SampleCount", default)]
    pub sample_count: Option<f64>,
    #[serde(rename = "Minimum", default)]
    pub minimum: Option<f64>,
    #[serde(rename = "Maximum", default)]
    pub maximum: Option<f64>,
    #[serde(rename = "Average", default)]
    pub average: Option<f64>,
    #[serde(rename = "ExtendedStatistics", default)]
    pub extended_statistics: BTreeMap<String, f64>,
}

/// The parameters of one statistics retrieval.
#[derive(Debug, Clone)]
pub struct StatisticsQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub statistics: Vec<String>,
    pub extended_statistics: Vec<String>,
    pub period_seconds: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Select the most recent datapoint.
///
/// Provider results are not guaranteed ordered; ties on the timestamp keep
/// the first-seen datapoint so the choice is stable.
pub fn newest_datapoint(datapoints: Vec<Datapoint>) -> Option<Datapoint> {
    let mut newest: Option<Datapoint> = None;
    for candidate in datapoints {
        match &newest {
            Some(current) if current.timestamp >= candidate.timestamp => {}
            _ => newest = Some(candidate),
        }
    }
    newest
}

/// CloudWatch's JSON protocol carries timestamps as fractional epoch seconds.
pub(crate) mod epoch_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(timestamp.timestamp_millis() as f64 / 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        let millis = (seconds * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(epoch: i64, sum: f64) -> Datapoint {
        Datapoint {
            timestamp: Utc.timestamp_opt(epoch, 0).unwrap(),
            unit: None,
            sum: Some(sum),
            sample_count: None,
            minimum: None,
            maximum: None,
            average: None,
            extended_statistics: BTreeMap::new(),
        }
    }

    #[test]
    fn newest_empty() {
        assert_eq!(newest_datapoint(Vec::new()), None);
    }

    #[test]
    fn newest_picks_max_timestamp_regardless_of_order() {
        let newest = newest_datapoint(vec![point(100, 1.0), point(300, 2.0), point(200, 3.0)]);
        assert_eq!(newest.unwrap().sum, Some(2.0));

        let newest = newest_datapoint(vec![point(300, 2.0), point(100, 1.0)]);
        assert_eq!(newest.unwrap().sum, Some(2.0));
    }

    #[test]
    fn newest_tie_keeps_first_seen() {
        let newest = newest_datapoint(vec![point(100, 1.0), point(100, 2.0)]);
        assert_eq!(newest.unwrap().sum, Some(1.0));
    }

    #[test]
    fn datapoint_decodes_from_wire_shape() {
        let dp: Datapoint = serde_json::from_str(
            r#"{
                "Timestamp": 1700000000.0,
                "Unit": "Count",
                "Sum": 42.0,
                "ExtendedStatistics": {"p99": 1.5}
            }"#,
        )
        .unwrap();
        assert_eq!(dp.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(dp.unit.as_deref(), Some("Count"));
        assert_eq!(dp.sum, Some(42.0));
        assert_eq!(dp.average, None);
        assert_eq!(dp.extended_statistics["p99"], 1.5);
    }
}
