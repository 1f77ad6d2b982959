//! HTTP side of monitoring
//!
//! | route     | body                                   |
//! |-----------|----------------------------------------|
//! | `/`       | service name, version and route list   |
//! | `/live`   | liveness status                        |
//! | `/ready`  | readiness status                       |
//! | `/health` | full [`HealthCheck`] report            |
//! | `/stats`  | [`ServiceStats`] of the LFG service    |
//! | `/metrics`| Prometheus text exposition             |
//!
//! Everything except `/` and `/metrics` needs a [`HealthProbe`]; without one
//! those routes answer 503.

use crate::config::ServiceSettings;
use crate::metrics::collector::MetricsCollector;
use crate::service::health::{HealthCheck, HealthProbe, HealthStatus, ServiceStats};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const ROUTES: [&str; 6] = ["/", "/live", "/ready", "/health", "/stats", "/metrics"];

/// Where the monitoring endpoints listen
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl From<&ServiceSettings> for HealthServerConfig {
    fn from(settings: &ServiceSettings) -> Self {
        Self {
            port: settings.health_port,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
struct MonitorState {
    service_name: String,
    collector: Arc<MetricsCollector>,
    probe: Option<HealthProbe>,
}

#[derive(Serialize)]
struct ServiceInfo<'a> {
    service: &'a str,
    version: &'static str,
    routes: &'static [&'static str],
}

#[derive(Serialize)]
struct StatusBody<'a> {
    service: &'a str,
    status: HealthStatus,
}

/// Axum server for health and metrics
pub struct HealthServer {
    config: HealthServerConfig,
    state: MonitorState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    pub fn new(config: HealthServerConfig, collector: Arc<MetricsCollector>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: MonitorState {
                service_name: "lfg-matchmaker".to_string(),
                collector,
                probe: None,
            },
            shutdown_tx,
        }
    }

    /// Attach the probe the status routes report on
    pub fn with_probe(mut self, probe: HealthProbe) -> Self {
        self.state.service_name = probe.service_name.clone();
        self.state.probe = Some(probe);
        self
    }

    /// Serve until [`Self::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid health server address")?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind health server to {}", addr))?;

        info!("Monitoring endpoints on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.create_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("Health server stopped");
        Ok(())
    }

    fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(service_info))
            .route("/live", get(liveness))
            .route("/ready", get(readiness))
            .route("/health", get(full_report))
            .route("/stats", get(lfg_stats))
            .route("/metrics", get(prometheus_text))
            .with_state(self.state.clone())
    }

    pub async fn stop(&self) -> Result<()> {
        if self.shutdown_tx.send(()).is_err() {
            warn!("Health server was not running");
        }
        Ok(())
    }
}

fn status_code(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    }
}

fn not_initialized() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "LFG service not initialized").into_response()
}

async fn service_info(State(state): State<MonitorState>) -> Response {
    Json(ServiceInfo {
        service: &state.service_name,
        version: env!("CARGO_PKG_VERSION"),
        routes: &ROUTES,
    })
    .into_response()
}

async fn liveness(State(state): State<MonitorState>) -> Response {
    let status = match &state.probe {
        Some(probe) => HealthCheck::liveness_check(probe)
            .await
            .unwrap_or(HealthStatus::Unhealthy),
        None => HealthStatus::Unhealthy,
    };

    let body = StatusBody {
        service: &state.service_name,
        status: status.clone(),
    };
    (status_code(&status), Json(body)).into_response()
}

async fn readiness(State(state): State<MonitorState>) -> Response {
    let Some(probe) = &state.probe else {
        return not_initialized();
    };

    let status = HealthCheck::readiness_check(probe).await.unwrap_or_else(|e| {
        error!("Readiness check failed: {}", e);
        HealthStatus::Unhealthy
    });
    debug!("Readiness: {}", status);
    (status_code(&status), status.to_string()).into_response()
}

async fn full_report(State(state): State<MonitorState>) -> Response {
    let Some(probe) = &state.probe else {
        return not_initialized();
    };

    match HealthCheck::check(probe).await {
        Ok(report) => {
            state.collector.update_health_status(report.status.gauge_value());
            (status_code(&report.status), Json(report)).into_response()
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Health check failed").into_response()
        }
    }
}

async fn lfg_stats(State(state): State<MonitorState>) -> Response {
    let Some(probe) = &state.probe else {
        return not_initialized();
    };

    let stats: ServiceStats = HealthCheck::gather_service_stats(probe);
    Json(stats).into_response()
}

async fn prometheus_text(State(state): State<MonitorState>) -> Response {
    let encoder = TextEncoder::new();
    let families = state.collector.registry().gather();

    match encoder.encode_to_string(&families) {
        Ok(body) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
