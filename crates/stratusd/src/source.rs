//! Rule-set retrieval.
//!
//! The rule set lives at a fixed location for the process lifetime — a local
//! file or an HTTP(S) URL — and reload always re-reads that same location.

use std::path::PathBuf;

use anyhow::Context;

use stratus_core::ExporterConfig;

#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Url(String),
}

impl ConfigSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            ConfigSource::Url(location.to_string())
        } else {
            ConfigSource::File(PathBuf::from(location))
        }
    }

    /// Fetch and validate the rule set. Any failure leaves the caller's
    /// active configuration untouched.
    pub async fn load(&self) -> anyhow::Result<ExporterConfig> {
        let yaml = match self {
            ConfigSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading rule set from {}", path.display()))?,
            ConfigSource::Url(url) => reqwest::get(url)
                .await
                .and_then(|response| response.error_for_status())
                .with_context(|| format!("fetching rule set from {url}"))?
                .text()
                .await
                .context("reading rule set response body")?,
        };
        let config = ExporterConfig::from_yaml(&yaml)?;
        Ok(config)
    }
}
