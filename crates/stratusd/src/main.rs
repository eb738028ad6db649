//! stratusd — the exporter daemon.
//!
//! Assembles the scrape engine and exposes it over HTTP:
//! - `GET /metrics` (optional `?namespace=` filter) — run one scrape pass
//! - `GET|POST /-/reload` — re-read the rule set, swap on success
//! - `GET /healthz` — liveness
//! - `GET /` — landing page
//!
//! SIGHUP triggers the same reload as the HTTP endpoint.
//!
//! # Usage
//!
//! ```text
//! stratusd --port 9106 --config-file /etc/stratus/stratus.yml
//! ```

mod server;
mod source;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use stratus_cloud::RestClient;
use stratus_collector::Collector;
use stratus_enrich::EsTagIndex;

use server::AppState;
use source::ConfigSource;

#[derive(Parser)]
#[command(name = "stratusd", about = "CloudWatch exporter with metadata-index tag enrichment")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "9106")]
    port: u16,

    /// Rule set location: a local path or an HTTP(S) URL.
    #[arg(long, env = "CONFIG_FILE")]
    config_file: String,

    /// Provider endpoint override (defaults to the region's monitoring endpoint).
    #[arg(long)]
    provider_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stratusd=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let source = ConfigSource::parse(&cli.config_file);
    let config = source.load().await?;
    info!(
        region = %config.region,
        rules = config.rules.len(),
        mappings = config.mappings.len(),
        "rule set loaded"
    );
    if let Some(role_arn) = &config.role_arn {
        info!(%role_arn, "delegated identity configured, credential exchange is handled by the signing layer");
    }

    let client = match cli.provider_endpoint {
        Some(endpoint) => RestClient::with_endpoint(endpoint)?,
        None => RestClient::new(&config.region)?,
    };
    let index = EsTagIndex::new()?;
    let collector = Arc::new(Collector::new(config, Arc::new(client), Arc::new(index)));

    let state = AppState {
        collector,
        source,
    };

    #[cfg(unix)]
    spawn_reload_on_hangup(state.clone());

    let router = server::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!(%addr, "exporter listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("exporter stopped");
    Ok(())
}

/// Reload the rule set on SIGHUP, keeping the active one on failure.
#[cfg(unix)]
fn spawn_reload_on_hangup(state: AppState) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                error!(error = %err, "failed to install SIGHUP handler");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading configuration");
            match server::reload_config(&state).await {
                Ok(()) => info!("configuration reloaded"),
                Err(err) => {
                    error!(error = %err, "configuration reload failed, previous rule set stays active");
                }
            }
        }
    });
}
