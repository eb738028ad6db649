//! stratus-enrich — joins discovered resources to ownership metadata.
//!
//! A resource identity found among a sample's labels is looked up in an
//! external metadata index and turned into a fixed-cardinality tag label set.
//! Enrichment is best-effort: every failure path degrades to the sentineled
//! default set and never aborts a scrape.

mod enricher;
mod es;
mod tags;

pub use enricher::TagEnricher;
pub use es::EsTagIndex;
pub use tags::{default_tag_set, extract_tags, TagSet, SENTINEL};

use async_trait::async_trait;

/// Errors from metadata-index lookups. These never leave the enricher; they
/// are logged and converted to the sentineled default set.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("index request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("index returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// Outcome of one index lookup.
#[derive(Debug, Clone)]
pub enum LookupResult {
    /// Exactly one document matched; its source object.
    Unique(serde_json::Map<String, serde_json::Value>),
    /// No document matched.
    NotFound,
    /// More than one document matched; ambiguous identity.
    Ambiguous(u64),
}

/// The metadata-index collaborator interface.
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Search `lookup_url` for documents whose `field` equals `value`.
    async fn lookup(
        &self,
        field: &str,
        value: &str,
        lookup_url: &str,
    ) -> Result<LookupResult, EnrichError>;
}
