//! Typed rule model and the validating parse that produces it.

use std::collections::HashMap;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::{RawConfig, RawMapping, RawMetricRule};

/// Engine default for a rule's aggregation period.
pub const DEFAULT_PERIOD_SECONDS: u64 = 60;
/// Engine default for the width of the query window.
pub const DEFAULT_RANGE_SECONDS: u64 = 120;
/// Engine default for how far behind "now" the query window ends.
pub const DEFAULT_DELAY_SECONDS: u64 = 60;

/// A standard provider aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Sum,
    SampleCount,
    Minimum,
    Maximum,
    Average,
}

impl Statistic {
    /// The five statistics requested when a rule configures none.
    pub const DEFAULT_SET: [Statistic; 5] = [
        Statistic::Sum,
        Statistic::SampleCount,
        Statistic::Minimum,
        Statistic::Maximum,
        Statistic::Average,
    ];

    /// Wire name, as sent to the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Sum => "Sum",
            Statistic::SampleCount => "SampleCount",
            Statistic::Minimum => "Minimum",
            Statistic::Maximum => "Maximum",
            Statistic::Average => "Average",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Sum" => Some(Statistic::Sum),
            "SampleCount" => Some(Statistic::SampleCount),
            "Minimum" => Some(Statistic::Minimum),
            "Maximum" => Some(Statistic::Maximum),
            "Average" => Some(Statistic::Average),
            _ => None,
        }
    }
}

/// Which discovered dimension combinations a rule accepts.
///
/// Exact and regex selection are mutually exclusive; the parse rejects rules
/// configuring both, so evaluation dispatches on the variant exactly once.
#[derive(Debug, Clone)]
pub enum DimensionSelect {
    /// Accept every discovered combination.
    None,
    /// Per-dimension allow-list of literal values.
    Exact(HashMap<String, Vec<String>>),
    /// Per-dimension allow-list of whole-value regular expressions.
    Regex(HashMap<String, Vec<Regex>>),
}

impl DimensionSelect {
    /// Whether a discovered `(name, value)` combination passes the selection.
    ///
    /// Dimensions not mentioned in the selection map are unconstrained; a
    /// dimension that is mentioned must carry an allowed value (exact) or
    /// wholly match at least one pattern (regex).
    pub fn matches<'a>(&self, dimensions: impl IntoIterator<Item = (&'a str, &'a str)>) -> bool {
        match self {
            DimensionSelect::None => true,
            DimensionSelect::Exact(allowed) => {
                for (name, value) in dimensions {
                    if let Some(values) = allowed.get(name) {
                        if !values.iter().any(|v| v == value) {
                            return false;
                        }
                    }
                }
                true
            }
            DimensionSelect::Regex(allowed) => {
                for (name, value) in dimensions {
                    if let Some(patterns) = allowed.get(name) {
                        if !patterns.iter().any(|p| p.is_match(value)) {
                            return false;
                        }
                    }
                }
                true
            }
        }
    }
}

/// One exposed metric family definition.
#[derive(Debug, Clone)]
pub struct MetricRule {
    pub namespace: String,
    pub metric_name: String,
    /// Dimension names to discover combinations for; empty means the rule
    /// targets the namespace-level series with no dimensions.
    pub dimensions: Vec<String>,
    pub select: DimensionSelect,
    pub statistics: Vec<Statistic>,
    pub extended_statistics: Vec<String>,
    pub period_seconds: u64,
    pub range_seconds: u64,
    pub delay_seconds: u64,
    pub help: Option<String>,
}

/// Links a namespace to its resource identity in the metadata index.
#[derive(Debug, Clone)]
pub struct ResourceMapping {
    /// The provider namespace this mapping applies to.
    pub namespace: String,
    /// Dimension/label name carrying the resource identifier.
    pub id_field: String,
    /// Identifier field name on the index side.
    pub es_id_field: String,
    /// Absolute index search URL (relative paths are resolved against
    /// `lookup_base_url` at parse time).
    pub lookup_url: String,
    /// Extra tag names to fetch beyond the fixed vocabulary.
    pub additional_labels: Vec<String>,
}

/// The immutable, validated rule set.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub region: String,
    pub role_arn: Option<String>,
    pub rules: Vec<MetricRule>,
    /// Keyed by namespace; at most one mapping per namespace (last wins).
    pub mappings: HashMap<String, ResourceMapping>,
}

impl ExporterConfig {
    /// Parse and validate the YAML rule set.
    ///
    /// Fails fast: any violation means no configuration at all, never a
    /// partially applied one.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = if input.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(input)?
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let region = raw.region.ok_or(ConfigError::MissingRegion)?;

        let default_period = raw.period_seconds.unwrap_or(DEFAULT_PERIOD_SECONDS);
        let default_range = raw.range_seconds.unwrap_or(DEFAULT_RANGE_SECONDS);
        let default_delay = raw.delay_seconds.unwrap_or(DEFAULT_DELAY_SECONDS);

        let raw_rules = raw.metrics.ok_or(ConfigError::MissingMetrics)?;
        if raw_rules.is_empty() {
            return Err(ConfigError::MissingMetrics);
        }

        let mut rules = Vec::with_capacity(raw_rules.len());
        for (index, raw_rule) in raw_rules.into_iter().enumerate() {
            rules.push(build_rule(
                index,
                raw_rule,
                default_period,
                default_range,
                default_delay,
            )?);
        }

        let mut mappings = HashMap::new();
        for (index, raw_mapping) in raw.mappings.unwrap_or_default().into_iter().enumerate() {
            let mapping = build_mapping(index, raw_mapping, raw.lookup_base_url.as_deref())?;
            mappings.insert(mapping.namespace.clone(), mapping);
        }

        Ok(ExporterConfig {
            region,
            role_arn: raw.role_arn,
            rules,
            mappings,
        })
    }
}

fn build_rule(
    index: usize,
    raw: RawMetricRule,
    default_period: u64,
    default_range: u64,
    default_delay: u64,
) -> Result<MetricRule, ConfigError> {
    let (Some(namespace), Some(metric_name)) = (raw.aws_namespace, raw.aws_metric_name) else {
        return Err(ConfigError::RuleMissingName { index });
    };

    let select = match (raw.aws_dimension_select, raw.aws_dimension_select_regex) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::ConflictingDimensionSelect {
                namespace,
                metric_name,
            });
        }
        (Some(exact), None) => DimensionSelect::Exact(exact),
        (None, Some(patterns)) => {
            let mut compiled = HashMap::with_capacity(patterns.len());
            for (dimension, values) in patterns {
                let mut list = Vec::with_capacity(values.len());
                for pattern in values {
                    // Whole-value matching, as the provider selection requires.
                    let anchored = format!("^(?:{pattern})$");
                    let regex = Regex::new(&anchored).map_err(|source| {
                        ConfigError::InvalidSelectRegex {
                            namespace: namespace.clone(),
                            metric_name: metric_name.clone(),
                            source,
                        }
                    })?;
                    list.push(regex);
                }
                compiled.insert(dimension, list);
            }
            DimensionSelect::Regex(compiled)
        }
        (None, None) => DimensionSelect::None,
    };

    let extended_statistics = raw.aws_extended_statistics.unwrap_or_default();
    let statistics = match raw.aws_statistics {
        Some(names) => {
            let mut statistics = Vec::with_capacity(names.len());
            for name in names {
                let statistic =
                    Statistic::parse(&name).ok_or_else(|| ConfigError::UnknownStatistic {
                        namespace: namespace.clone(),
                        metric_name: metric_name.clone(),
                        statistic: name.clone(),
                    })?;
                statistics.push(statistic);
            }
            statistics
        }
        // Standard statistics default in only when extended statistics are
        // not explicitly configured either.
        None if extended_statistics.is_empty() => Statistic::DEFAULT_SET.to_vec(),
        None => Vec::new(),
    };

    Ok(MetricRule {
        namespace,
        metric_name,
        dimensions: raw.aws_dimensions.unwrap_or_default(),
        select,
        statistics,
        extended_statistics,
        period_seconds: raw.period_seconds.unwrap_or(default_period),
        range_seconds: raw.range_seconds.unwrap_or(default_range),
        delay_seconds: raw.delay_seconds.unwrap_or(default_delay),
        help: raw.help,
    })
}

fn build_mapping(
    index: usize,
    raw: RawMapping,
    lookup_base_url: Option<&str>,
) -> Result<ResourceMapping, ConfigError> {
    let (Some(namespace), Some(id_field), Some(lookup_url)) =
        (raw.name, raw.id_field, raw.lookup_url)
    else {
        return Err(ConfigError::MappingMissingField { index });
    };

    let lookup_url = if lookup_url.starts_with("http://") || lookup_url.starts_with("https://") {
        lookup_url
    } else {
        match lookup_base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                lookup_url.trim_start_matches('/')
            ),
            None => {
                return Err(ConfigError::RelativeLookupUrl {
                    name: namespace,
                    lookup_url,
                });
            }
        }
    };

    Ok(ResourceMapping {
        namespace,
        es_id_field: raw.es_id_field.unwrap_or_else(|| id_field.clone()),
        id_field,
        lookup_url,
        additional_labels: raw.additional_labels.unwrap_or_default(),
    })
}
