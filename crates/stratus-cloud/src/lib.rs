//! stratus-cloud — the monitoring-provider collaborator.
//!
//! Defines the two-call interface the scrape engine consumes (metric-catalog
//! listing and statistics retrieval) plus a REST implementation speaking the
//! CloudWatch JSON protocol. Everything upstream of the wire — credentials,
//! request signing — belongs to the deployment, not to this crate.

mod client;
mod types;

pub use client::{CloudError, CloudWatchClient, RestClient};
pub use types::{newest_datapoint, Datapoint, Dimension, Metric, MetricsPage, StatisticsQuery};
