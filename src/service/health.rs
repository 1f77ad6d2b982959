//! Health checks for the LFG service
//!
//! Readiness means the world lock can be taken; liveness only looks at the
//! running flag.

use crate::metrics::MetricsCollector;
use crate::session::LfgService;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value exported through the health gauge
    pub fn gauge_value(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// What the health checks look at
#[derive(Clone)]
pub struct HealthProbe {
    pub service_name: String,
    pub lfg: Arc<LfgService>,
    pub metrics: Arc<MetricsCollector>,
    pub running: Arc<RwLock<bool>>,
    pub started_at: Instant,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Set when the component is not healthy
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub online_characters: usize,
    pub active_groups: usize,
    /// Groups formed by matching since start
    pub groups_created: u64,
    /// Members placed by matching since start
    pub members_added: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Full health check with per-component results
    pub async fn check(probe: &HealthProbe) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(probe).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        let world_check = Self::check_world(probe);
        if world_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(world_check);

        Ok(HealthCheck {
            status: overall_status,
            service: probe.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(probe),
        })
    }

    pub async fn liveness_check(probe: &HealthProbe) -> Result<HealthStatus> {
        if *probe.running.read().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    pub async fn readiness_check(probe: &HealthProbe) -> Result<HealthStatus> {
        if !*probe.running.read().await {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(Self::check_world(probe).status)
    }

    async fn check_service_running(probe: &HealthProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if *probe.running.read().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_world(probe: &HealthProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match probe.lfg.with_world(|world| world.players.len()) {
            Ok(online) => {
                debug!("World check passed with {} characters online", online);
                (HealthStatus::Healthy, None)
            }
            Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
        };

        ComponentCheck {
            name: "world".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Counters and population figures, without running any checks
    pub fn gather_service_stats(probe: &HealthProbe) -> ServiceStats {
        let (online_characters, active_groups) = probe
            .lfg
            .with_world(|world| (world.players.len(), world.groups.count()))
            .unwrap_or_default();

        ServiceStats {
            online_characters,
            active_groups,
            groups_created: probe.metrics.matching().groups_created_total.get(),
            members_added: probe.metrics.matching().members_added_total.get(),
            uptime_seconds: probe.started_at.elapsed().as_secs(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
