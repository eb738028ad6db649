//! HTTP listener: exposition, reload, liveness.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{error, info};

use stratus_collector::{render_text, Collector};

use crate::source::ConfigSource;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub source: ConfigSource,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics).post(metrics))
        .route("/-/reload", get(reload).post(reload))
        .with_state(state)
}

#[derive(Deserialize)]
struct MetricsParams {
    namespace: Option<String>,
}

/// GET/POST /metrics — one scrape pass, optionally restricted to a namespace.
async fn metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsParams>,
) -> impl IntoResponse {
    let families = state.collector.collect(params.namespace.as_deref()).await;
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        render_text(&families),
    )
}

/// Re-read the rule set from its original location and swap it in. On any
/// failure the active rule set stays in effect.
pub async fn reload_config(state: &AppState) -> anyhow::Result<()> {
    let config = state.source.load().await?;
    state.collector.apply_config(config);
    Ok(())
}

/// GET/POST /-/reload
async fn reload(State(state): State<AppState>) -> impl IntoResponse {
    match reload_config(&state).await {
        Ok(()) => {
            info!("configuration reloaded");
            (StatusCode::OK, "Configuration reloaded\n".to_string())
        }
        Err(err) => {
            error!(error = %err, "configuration reload failed, previous rule set stays active");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Reload failed: {err:#}\n"),
            )
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn home() -> Html<&'static str> {
    Html(
        "<html>\
         <head><title>Stratus Exporter</title></head>\
         <body><h1>Stratus Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body>\
         </html>",
    )
}
