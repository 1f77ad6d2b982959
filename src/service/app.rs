//! Main application state and service coordination
//!
//! Wires the LFG service to its in-process collaborators, the metrics
//! server and the periodic gauge refresh task.

use crate::config::AppConfig;
use crate::metrics::{MetricsCollector, MetricsService};
use crate::service::health::{HealthCheck, HealthProbe};
use crate::session::LfgService;
use crate::talent::{StaticTalentStore, TalentStore};
use crate::world::{InMemoryChannelService, World};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Interval between gauge refreshes
const STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,
    lfg: Arc<LfgService>,
    channels: InMemoryChannelService,
    metrics_service: Arc<MetricsService>,
    background_tasks: Vec<JoinHandle<()>>,
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize with the built-in talent table
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_talents(config, Arc::new(StaticTalentStore::synthetic()))
    }

    /// Initialize with a specific talent table
    pub fn with_talents(
        config: AppConfig,
        talents: Arc<dyn TalentStore>,
    ) -> Result<Self, ServiceError> {
        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        info!("Initializing LFG matchmaking service '{}'", config.service.name);
        info!(
            "LFG settings: channel_restricted={}, max_group_size={}, listing_display_limit={}",
            config.lfg.channel_restricted,
            config.lfg.max_group_size,
            config.lfg.listing_display_limit
        );

        let collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let channels = InMemoryChannelService::new();
        let world = World::in_memory(config.lfg.max_group_size, channels.clone());
        let lfg = Arc::new(LfgService::new(world, talents, &config.lfg, collector.clone()));

        let is_running = Arc::new(RwLock::new(false));

        let probe = HealthProbe {
            service_name: config.service.name.clone(),
            lfg: lfg.clone(),
            metrics: collector,
            running: is_running.clone(),
            started_at: Instant::now(),
        };
        let metrics_service = Arc::new(MetricsService::new(&config.service, probe));

        Ok(Self {
            config,
            lfg,
            channels,
            metrics_service,
            background_tasks: Vec::new(),
            is_running,
        })
    }

    /// Start the metrics server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting LFG matchmaking service");
        *self.is_running.write().await = true;

        self.start_metrics_service().await?;
        self.start_background_tasks();

        info!("LFG matchmaking service started");
        Ok(())
    }

    /// Stop background work and the metrics server
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of LFG service");
        *self.is_running.write().await = false;

        self.stop_background_tasks();

        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        }

        let probe = self.probe();
        let health = HealthCheck::check(&probe)
            .await
            .map_err(|e| ServiceError::BackgroundTask {
                message: format!("Failed to get final stats: {}", e),
            })?;
        info!("Final service statistics: {:?}", health.stats);
        info!("LFG service shutdown completed");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn lfg(&self) -> Arc<LfgService> {
        self.lfg.clone()
    }

    /// Handle to the in-process LFG channel
    pub fn channels(&self) -> &InMemoryChannelService {
        &self.channels
    }

    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Probe used by the health checks
    pub fn probe(&self) -> HealthProbe {
        self.metrics_service.probe().clone()
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            }
        });
        self.background_tasks.push(handle);

        // give the listener a moment to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Metrics and health endpoints started on port {}", port);
        Ok(())
    }

    fn start_background_tasks(&mut self) {
        let metrics_service = self.metrics_service.clone();
        let running = self.is_running.clone();

        let stats_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_INTERVAL);
            info!("Stats refresh task started");

            while *running.read().await {
                interval.tick().await;
                let status = metrics_service.refresh().await;
                debug!("Periodic health refresh: {}", status);
            }

            info!("Stats refresh task stopped");
        });

        self.background_tasks.push(stats_task);
    }

    fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        for task in self.background_tasks.drain(..) {
            task.abort();
        }
        debug!("Aborted {} background tasks", task_count);
    }
}
