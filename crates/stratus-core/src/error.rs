//! Configuration load errors.

use thiserror::Error;

/// Errors raised by the validating configuration parse.
///
/// A load that returns any of these installs nothing; at reload time the
/// previously active configuration stays in effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid YAML: {0}")]
    Decode(#[from] serde_yaml::Error),

    #[error("must provide region")]
    MissingRegion,

    #[error("must provide metrics")]
    MissingMetrics,

    #[error("metric rule {index}: must provide aws_namespace and aws_metric_name")]
    RuleMissingName { index: usize },

    #[error(
        "metric rule {namespace}/{metric_name}: must not provide aws_dimension_select \
         and aws_dimension_select_regex at the same time"
    )]
    ConflictingDimensionSelect {
        namespace: String,
        metric_name: String,
    },

    #[error("metric rule {namespace}/{metric_name}: unknown statistic {statistic:?}")]
    UnknownStatistic {
        namespace: String,
        metric_name: String,
        statistic: String,
    },

    #[error("metric rule {namespace}/{metric_name}: invalid dimension select regex: {source}")]
    InvalidSelectRegex {
        namespace: String,
        metric_name: String,
        source: regex::Error,
    },

    #[error("mapping {index}: must provide name, id_field and lookup_url")]
    MappingMissingField { index: usize },

    #[error("mapping {name}: lookup_url {lookup_url} is relative and no lookup_base_url is set")]
    RelativeLookupUrl { name: String, lookup_url: String },
}
