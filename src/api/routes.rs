//! API Routes
//!
//! HTTP endpoints for discovery, probing, health and metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::Metrics;
use crate::config::HelperConfig;
use crate::discovery::{DiscoveryAggregator, DnsLookup};
use crate::probe::{self, ProbeOptions};

const INDEX_HTML: &str = r#"
        <div><a href="/apps">List available apps in network</a></div>
        <div><a href="/ping">Ping resource</a></div>"#;

const PING_FORM_HTML: &str = r#"
        <form action="/ping" method="post">
            <label for="addr">Addr:</label>
            <input type="text" id="addr" name="addr" value="https://google.com">
            <input type="submit" value="Submit">
        </form>
    "#;

/// Shared API state
pub struct ApiState {
    pub config: Arc<HelperConfig>,
    pub discovery: DiscoveryAggregator,
    /// Resolver shared with discovery, used for probe targets
    pub dns: Arc<dyn DnsLookup>,
    pub metrics: Arc<Metrics>,
}

impl ApiState {
    pub fn new(config: Arc<HelperConfig>, dns: Arc<dyn DnsLookup>, metrics: Arc<Metrics>) -> Self {
        Self {
            config,
            discovery: DiscoveryAggregator::new(dns.clone()),
            dns,
            metrics,
        }
    }
}

/// Submitted probe form
#[derive(Debug, Deserialize)]
pub struct PingForm {
    pub addr: String,
}

/// Build the router over shared state
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))

        // Discovery
        .route("/apps", get(list_apps))

        // Probe
        .route("/ping", get(ping_form).post(ping))

        // Health & Metrics
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json))

        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(
    config: Arc<HelperConfig>,
    dns: Arc<dyn DnsLookup>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let addr = config.listen_addr()?;
    let state = Arc::new(ApiState::new(config, dns, metrics));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Private network helper listening at http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// GET / - Index page
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /apps - Discovery document
async fn list_apps(State(state): State<Arc<ApiState>>) -> Response {
    state.metrics.inc_apps_requests();

    match state.discovery.aggregate().await {
        Ok(result) => {
            let failures = result.failure_count();
            state.metrics.add_lookup_failures(failures as u64);
            info!(
                "📋 Discovery: {} apps, {} resolved, {} inline failures",
                result.all_apps().len(),
                result.app_entry_count(),
                failures
            );
            match serde_json::to_string_pretty(&result) {
                Ok(body) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response(),
                Err(e) => {
                    warn!("Failed to serialize discovery result: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Err(failure) => {
            state.metrics.inc_apps_failures();
            (StatusCode::BAD_REQUEST, Json(failure)).into_response()
        }
    }
}

/// GET /ping - Probe form
async fn ping_form() -> Html<&'static str> {
    Html(PING_FORM_HTML)
}

/// POST /ping - Probe the submitted address
async fn ping(State(state): State<Arc<ApiState>>, Form(form): Form<PingForm>) -> Response {
    state.metrics.inc_ping_requests();

    let options = ProbeOptions {
        timeout: state.config.ping_timeout(),
        default_port: state.config.ping_default_port,
    };

    match probe::probe(state.dns.as_ref(), &form.addr, options).await {
        Ok(report) => {
            if !report.reachable {
                state.metrics.inc_ping_unreachable();
            }
            Json(report).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /health - Liveness of the helper itself
async fn health_check() -> impl IntoResponse {
    "OK"
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
