//! Decoded configuration schema.
//!
//! Mirrors the YAML surface one-to-one with every field optional; the
//! validating parse in [`crate::model`] turns this into the typed rule model
//! and is the only place presence rules are enforced.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    pub region: Option<String>,
    pub role_arn: Option<String>,
    pub period_seconds: Option<u64>,
    pub range_seconds: Option<u64>,
    pub delay_seconds: Option<u64>,
    pub lookup_base_url: Option<String>,
    pub metrics: Option<Vec<RawMetricRule>>,
    pub mappings: Option<Vec<RawMapping>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawMetricRule {
    pub aws_namespace: Option<String>,
    pub aws_metric_name: Option<String>,
    pub aws_statistics: Option<Vec<String>>,
    pub aws_extended_statistics: Option<Vec<String>>,
    pub aws_dimensions: Option<Vec<String>>,
    pub aws_dimension_select: Option<HashMap<String, Vec<String>>>,
    pub aws_dimension_select_regex: Option<HashMap<String, Vec<String>>>,
    pub period_seconds: Option<u64>,
    pub range_seconds: Option<u64>,
    pub delay_seconds: Option<u64>,
    pub help: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawMapping {
    pub name: Option<String>,
    pub id_field: Option<String>,
    pub es_id_field: Option<String>,
    pub lookup_url: Option<String>,
    pub additional_labels: Option<Vec<String>>,
}
