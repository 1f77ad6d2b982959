//! Metrics and monitoring for the LFG matchmaking service
//!
//! Prometheus counters for matching and listing, plus the HTTP server that
//! exposes them next to the health endpoints.

pub mod collector;
pub mod health;

pub use collector::{
    AttemptKind, ListingMetrics, MatchMetrics, MetricsCollector, MetricsTimer, ServiceMetrics,
};
pub use health::{HealthServer, HealthServerConfig};

use crate::config::ServiceSettings;
use crate::service::health::{HealthCheck, HealthProbe, HealthStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Collector, exporter and the probe that feeds the service gauges
#[derive(Clone)]
pub struct MetricsService {
    collector: Arc<MetricsCollector>,
    health_server: Arc<HealthServer>,
    probe: HealthProbe,
}

impl MetricsService {
    pub fn new(settings: &ServiceSettings, probe: HealthProbe) -> Self {
        let collector = probe.metrics.clone();
        let health_server = HealthServer::new(HealthServerConfig::from(settings), collector.clone())
            .with_probe(probe.clone());

        Self {
            collector,
            health_server: Arc::new(health_server),
            probe,
        }
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn probe(&self) -> &HealthProbe {
        &self.probe
    }

    /// Run a health check and copy its figures into the service gauges
    pub async fn refresh(&self) -> HealthStatus {
        match HealthCheck::check(&self.probe).await {
            Ok(health) => {
                let service = self.collector.service();
                service.uptime_seconds.set(health.stats.uptime_seconds as i64);
                self.collector
                    .update_online_characters(health.stats.online_characters);
                self.collector.update_health_status(health.status.gauge_value());
                debug!(
                    "Health {}: {} online, {} groups",
                    health.status, health.stats.online_characters, health.stats.active_groups
                );
                health.status
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                self.collector
                    .update_health_status(HealthStatus::Unhealthy.gauge_value());
                HealthStatus::Unhealthy
            }
        }
    }

    /// Serve the monitoring endpoints until stopped
    pub async fn start(&self) -> anyhow::Result<()> {
        self.health_server.start().await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.health_server.stop().await
    }
}
