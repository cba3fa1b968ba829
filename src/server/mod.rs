//! Report page server.
//!
//! Serves the admin page with its "Run Check" button and the endpoint
//! the button calls. Routes are registered once in [`router`].

use crate::analysis::{Aggregator, AggregatorConfig};
use crate::registry::PluginRegistry;
use crate::report::generate_html_table;
use crate::scanner::{PluginScanner, ScanConfig};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Action identifier the report page sends to the check endpoint.
pub const FETCH_ACTION: &str = "fetch_plugin_data";

/// Shared, read-only state for all requests.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn PluginRegistry>,
    pub plugins_dir: PathBuf,
    pub scan_config: ScanConfig,
    pub aggregator_config: AggregatorConfig,
}

#[derive(Debug, Deserialize)]
struct AjaxParams {
    action: Option<String>,
}

/// Build the router with every route the server answers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(report_page))
        .route("/ajax", get(ajax))
        .route("/healthz", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn run_server(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let local = listener.local_addr().context("Failed to read bound address")?;
    info!("Report page available at http://{}/", local);

    axum::serve(listener, router(state))
        .await
        .context("Server error")
}

async fn report_page() -> Html<&'static str> {
    Html(REPORT_PAGE)
}

async fn ajax(State(state): State<AppState>, Query(params): Query<AjaxParams>) -> Response {
    if params.action.as_deref() != Some(FETCH_ACTION) {
        return (StatusCode::BAD_REQUEST, "0").into_response();
    }

    info!("Plugin check requested");

    match fetch_plugin_data(&state).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Plugin check failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Plugin check failed").into_response()
        }
    }
}

/// Scan, look up, sort, classify and render one report table.
async fn fetch_plugin_data(state: &AppState) -> Result<String> {
    let scanner = PluginScanner::new(state.plugins_dir.clone(), state.scan_config.clone());
    let plugins = tokio::task::spawn_blocking(move || scanner.scan())
        .await
        .context("Plugin scan task failed")??;

    let report = Aggregator::new(state.registry.as_ref(), state.aggregator_config.clone())
        .run(&state.plugins_dir, &plugins, Utc::now())
        .await;

    Ok(generate_html_table(&report.rows))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

const REPORT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Plugin Checker</title>
<style>
  body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 2em; }
  table.plugin-report { border-collapse: collapse; width: 100%; margin-top: 1em; }
  table.plugin-report th, table.plugin-report td { border: 1px solid #ccd0d4; padding: 6px 10px; text-align: left; }
  .notice-error { color: #b32d2e; }
</style>
</head>
<body>
<div class="wrap">
<h1>Plugin List by Update Date</h1>
<button id="run-plugin-check">Run Check</button>
<div id="plugin-list-container"></div>
</div>
<script>
document.getElementById('run-plugin-check').addEventListener('click', function () {
  var container = document.getElementById('plugin-list-container');
  container.innerHTML = '<p>Checking Plugins...</p>';

  fetch('ajax?action=fetch_plugin_data')
    .then(function (response) {
      if (!response.ok) {
        throw new Error('HTTP ' + response.status);
      }
      return response.text();
    })
    .then(function (html) {
      container.innerHTML = html;
    })
    .catch(function () {
      container.innerHTML = '<p class="notice notice-error">Failed to fetch plugin data.</p>';
    });
});
</script>
</body>
</html>
"#;
