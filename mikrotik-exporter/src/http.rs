//! HTTP server for the probe and exporter endpoints.

use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::collector::CollectorHandle;
use crate::config::ExporterConfig;
use crate::device::{Credential, DeviceClient};
use crate::exposition;
use crate::probe::Prober;
use crate::process::{self, SelfMetrics};
use crate::registry::CollectorRegistry;

/// Profile and module used when a probe does not name one.
pub const DEFAULT_PROFILE: &str = "default";

/// Rejected `/probe` request. Always detected before contacting the device.
#[derive(Debug, Error)]
pub enum ProbeRequestError {
    #[error("Missing 'target' parameter")]
    MissingTarget,
    #[error("Auth configuration '{0}' not found")]
    UnknownAuth(String),
    #[error("Module configuration '{0}' not found")]
    UnknownModule(String),
    #[error("No collectors enabled for module '{0}'")]
    NoCollectors(String),
}

impl IntoResponse for ProbeRequestError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Rejected probe request");
        (StatusCode::BAD_REQUEST, format!("{}\n", self)).into_response()
    }
}

/// Raw `/probe` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProbeParams {
    pub target: Option<String>,
    pub auth: Option<String>,
    pub module: Option<String>,
}

/// A validated probe: everything needed to contact the device.
struct ProbeRequest {
    target: String,
    credential: Credential,
    collectors: Vec<CollectorHandle>,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ExporterConfig>,
    registry: Arc<CollectorRegistry>,
    prober: Prober,
    self_metrics: SelfMetrics,
}

impl AppState {
    /// Build the shared state, including the device HTTP client.
    pub fn new(
        config: Arc<ExporterConfig>,
        registry: Arc<CollectorRegistry>,
    ) -> Result<Self, reqwest::Error> {
        let client = DeviceClient::new(
            &config.probe.scheme,
            config.probe.fetch_timeout(),
            config.probe.accept_invalid_certs,
        )?;
        let prober = Prober::new(client, config.probe.timeout(), &config.namespace);
        let self_metrics = SelfMetrics::new(registry.len());

        Ok(Self {
            config,
            registry,
            prober,
            self_metrics,
        })
    }

    fn resolve(&self, params: ProbeParams) -> Result<ProbeRequest, ProbeRequestError> {
        let target = params
            .target
            .filter(|t| !t.is_empty())
            .ok_or(ProbeRequestError::MissingTarget)?;

        let auth_name = non_empty_or_default(params.auth);
        let module_name = non_empty_or_default(params.module);

        let credential = self
            .config
            .auth(&auth_name)
            .ok_or(ProbeRequestError::UnknownAuth(auth_name))?;

        let module = self
            .config
            .module(&module_name)
            .ok_or_else(|| ProbeRequestError::UnknownModule(module_name.clone()))?;

        let collectors = self.registry.resolve(&module.collectors);
        if collectors.is_empty() {
            return Err(ProbeRequestError::NoCollectors(module_name));
        }

        Ok(ProbeRequest {
            target,
            credential,
            collectors,
        })
    }
}

fn non_empty_or_default(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/probe", get(probe_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health-check", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the /probe endpoint.
async fn probe_handler(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
) -> Result<Response, ProbeRequestError> {
    let request = state.resolve(params)?;

    let report = state
        .prober
        .probe(&request.target, request.credential, &request.collectors)
        .await;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
        report.render(),
    )
        .into_response())
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.self_metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, process::CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode exporter metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handler for the /health-check endpoint.
async fn health_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mikrotik-exporter",
    }))
    .into_response()
}

/// Handler for the / endpoint.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.registry))
}

fn render_index(registry: &CollectorRegistry) -> String {
    let mut html = String::from(INDEX_HEAD);

    for collector in registry.iter() {
        writeln!(
            html,
            "        <h4>{}</h4>\n        <ul>",
            escape_html(collector.name())
        )
        .ok();
        for desc in collector.describe() {
            writeln!(
                html,
                "            <li><code>{}</code> ({}): {}</li>",
                escape_html(desc.name()),
                desc.kind().as_str(),
                escape_html(desc.help())
            )
            .ok();
        }
        html.push_str("        </ul>\n");
    }

    html.push_str(INDEX_TAIL);
    html
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const INDEX_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>MikroTik Exporter</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        .container { max-width: 900px; }
        .endpoint { background: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 5px; }
        code { background: #e8e8e8; padding: 2px 4px; border-radius: 3px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>MikroTik Exporter</h1>
        <p>Prometheus metrics for MikroTik RouterOS devices, fetched over the REST API on each probe.</p>

        <h2>Usage</h2>
        <div class="endpoint">
            <code>/probe?target=&lt;host:port&gt;&amp;auth=&lt;auth_name&gt;&amp;module=&lt;module_name&gt;</code>
        </div>
        <ul>
            <li><strong>target</strong> (required): address and port of the device, e.g. 192.168.88.1:80</li>
            <li><strong>auth</strong> (optional): auth profile name (default: "default")</li>
            <li><strong>module</strong> (optional): module name (default: "default")</li>
        </ul>

        <h2>Endpoints</h2>
        <ul>
            <li><a href="/metrics">/metrics</a>: exporter process metrics</li>
            <li><a href="/health-check">/health-check</a>: liveness check</li>
        </ul>

        <h2>Collectors</h2>
"#;

const INDEX_TAIL: &str = r#"    </div>
</body>
</html>
"#;

/// HTTP server configuration.
pub struct HttpServer {
    state: AppState,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(state: AppState, listen_addr: SocketAddr) -> Self {
        Self { state, listen_addr }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
