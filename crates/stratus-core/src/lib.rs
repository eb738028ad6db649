//! stratus-core — the declarative rule model.
//!
//! Decodes the operator-supplied YAML rule set into an immutable, fully
//! validated [`ExporterConfig`]. All "must provide X" checks live in the
//! validating parse; downstream components never see a partially formed rule.

mod error;
mod model;
pub mod naming;
mod schema;

pub use error::ConfigError;
pub use model::{
    DimensionSelect, ExporterConfig, MetricRule, ResourceMapping, Statistic, DEFAULT_DELAY_SECONDS,
    DEFAULT_PERIOD_SECONDS, DEFAULT_RANGE_SECONDS,
};
