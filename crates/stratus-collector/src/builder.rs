//! Sample accumulation and family naming for one rule.

use std::collections::BTreeMap;

use stratus_cloud::Datapoint;
use stratus_core::naming::{safe_name, snake_case};
use stratus_core::MetricRule;

use crate::family::{MetricFamily, MetricKind, Sample};

const DYNAMODB_NAMESPACE: &str = "AWS/DynamoDB";
const SECONDARY_INDEX_DIMENSION: &str = "GlobalSecondaryIndexName";

/// DynamoDB reuses these metric names on secondary indexes with different
/// semantics; rules dimensioned on the index get a distinct family name.
const BROKEN_DYNAMO_METRICS: [&str; 6] = [
    "ConsumedReadCapacityUnits",
    "ConsumedWriteCapacityUnits",
    "ProvisionedReadCapacityUnits",
    "ProvisionedWriteCapacityUnits",
    "ReadThrottleEvents",
    "WriteThrottleEvents",
];

/// `safe(lower(namespace) + "_" + snake(metric))`, plus the DynamoDB
/// secondary-index suffix where it applies.
pub(crate) fn base_name(rule: &MetricRule) -> String {
    let mut name = safe_name(&format!(
        "{}_{}",
        rule.namespace.to_lowercase(),
        snake_case(&rule.metric_name)
    ));
    if rule.namespace == DYNAMODB_NAMESPACE
        && rule
            .dimensions
            .iter()
            .any(|d| d == SECONDARY_INDEX_DIMENSION)
        && BROKEN_DYNAMO_METRICS.contains(&rule.metric_name.as_str())
    {
        name.push_str("_index");
    }
    name
}

fn help_text(rule: &MetricRule, unit: Option<&str>, statistic: &str) -> String {
    if let Some(help) = &rule.help {
        return help.clone();
    }
    format!(
        "CloudWatch metric {} {} Dimensions: [{}] Statistic: {} Unit: {}",
        rule.namespace,
        rule.metric_name,
        rule.dimensions.join(", "),
        statistic,
        unit.unwrap_or("unknown")
    )
}

/// Accumulates samples across a rule's dimension combinations, one bucket
/// per statistic, then emits only the families that gathered samples.
pub(crate) struct RuleSamples {
    base_name: String,
    unit: Option<String>,
    sum: Vec<Sample>,
    sample_count: Vec<Sample>,
    minimum: Vec<Sample>,
    maximum: Vec<Sample>,
    average: Vec<Sample>,
    extended: BTreeMap<String, Vec<Sample>>,
}

impl RuleSamples {
    pub(crate) fn new(rule: &MetricRule) -> Self {
        Self {
            base_name: base_name(rule),
            unit: None,
            sum: Vec::new(),
            sample_count: Vec::new(),
            minimum: Vec::new(),
            maximum: Vec::new(),
            average: Vec::new(),
            extended: BTreeMap::new(),
        }
    }

    /// Record one datapoint's populated statistics under the given labels.
    pub(crate) fn record(&mut self, datapoint: &Datapoint, labels: Vec<(String, String)>) {
        self.unit = datapoint.unit.clone();

        let buckets = [
            (&mut self.sum, datapoint.sum),
            (&mut self.sample_count, datapoint.sample_count),
            (&mut self.minimum, datapoint.minimum),
            (&mut self.maximum, datapoint.maximum),
            (&mut self.average, datapoint.average),
        ];
        for (bucket, value) in buckets {
            if let Some(value) = value {
                bucket.push(Sample {
                    labels: labels.clone(),
                    value,
                });
            }
        }
        for (key, value) in &datapoint.extended_statistics {
            self.extended.entry(key.clone()).or_default().push(Sample {
                labels: labels.clone(),
                value: *value,
            });
        }
    }

    /// Emit one family per statistic that produced at least one sample.
    pub(crate) fn into_families(self, rule: &MetricRule) -> Vec<MetricFamily> {
        let unit = self.unit.as_deref();
        let mut families = Vec::new();

        let standard = [
            ("_sum", "Sum", self.sum),
            ("_sample_count", "SampleCount", self.sample_count),
            ("_minimum", "Minimum", self.minimum),
            ("_maximum", "Maximum", self.maximum),
            ("_average", "Average", self.average),
        ];
        for (suffix, statistic, samples) in standard {
            if samples.is_empty() {
                continue;
            }
            families.push(MetricFamily {
                name: format!("{}{}", self.base_name, suffix),
                help: help_text(rule, unit, statistic),
                kind: MetricKind::Gauge,
                samples,
            });
        }
        for (key, samples) in self.extended {
            families.push(MetricFamily {
                name: format!("{}_{}", self.base_name, safe_name(&snake_case(&key))),
                help: help_text(rule, unit, &key),
                kind: MetricKind::Gauge,
                samples,
            });
        }
        families
    }
}
