/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! HTTP scrape endpoint

use crate::ports::MetricsExportService;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Path of the scrape endpoint
pub const METRICS_PATH: &str = "/metrics";

const INDEX_HTML: &str = r#"<!doctype html>
<html>
    <head>
        <meta charset="utf-8">
        <title>Nvidia SMI Exporter</title>
    </head>
    <body>
        <h1>Nvidia SMI Exporter</h1>
        <p><a href="/metrics">Metrics</a></p>
    </body>
</html>"#;

/// Build the exporter router
///
/// * `GET /metrics` - metric lines, always `200 OK`
/// * anything else - landing page linking to the metrics
pub fn router(service: Arc<dyn MetricsExportService>) -> Router {
    Router::new()
        .route("/", get(index))
        .route(METRICS_PATH, get(metrics))
        .fallback(index)
        .with_state(service)
}

async fn index() -> Html<&'static str> {
    log::info!("Serving /index");
    Html(INDEX_HTML)
}

/// Source failures are logged and answered with an empty body
async fn metrics(State(service): State<Arc<dyn MetricsExportService>>) -> String {
    log::info!("Serving /metrics");

    match service.render_metrics().await {
        Ok(body) => body,
        Err(e) => {
            log::error!("Failed to collect nvidia-smi report: {e}");
            String::new()
        }
    }
}
