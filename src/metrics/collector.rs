//! Metrics collection using Prometheus
//!
//! This module provides metrics for match attempts, group formation,
//! channel side effects and listing queries.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which matching algorithm ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Join,
    AddMore,
}

impl AttemptKind {
    fn label(self) -> &'static str {
        match self {
            AttemptKind::Join => "join",
            AttemptKind::AddMore => "add_more",
        }
    }
}

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Matching-related metrics
    match_metrics: MatchMetrics,

    /// Listing query metrics
    listing_metrics: ListingMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Client requests handled, by request kind
    pub requests_total: IntCounterVec,

    /// Characters currently online
    pub online_characters: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Matching-related metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Match attempts by algorithm and outcome
    pub attempts_total: IntCounterVec,

    /// Groups created by the matchmaker
    pub groups_created_total: IntCounter,

    /// Group creations refused by the group store
    pub group_creation_failures_total: IntCounter,

    /// Members added by the matchmaker
    pub members_added_total: IntCounter,

    /// LFG channel removals caused by matching
    pub channel_removals_total: IntCounter,

    /// Duration of a full scan
    pub attempt_duration: HistogramVec,
}

/// Listing query metrics
#[derive(Clone)]
pub struct ListingMetrics {
    /// Listing responses built
    pub queries_total: IntCounter,

    /// Matching characters found per query
    pub found_per_query: Histogram,

    /// Queries whose results exceeded the display limit
    pub truncated_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let listing_metrics = ListingMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            match_metrics,
            listing_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get matching metrics
    pub fn matching(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    /// Get listing metrics
    pub fn listing(&self) -> &ListingMetrics {
        &self.listing_metrics
    }

    /// Record a finished match attempt
    pub fn record_attempt(&self, kind: AttemptKind, outcome: &str, duration: Duration) {
        self.match_metrics
            .attempts_total
            .with_label_values(&[kind.label(), outcome])
            .inc();

        self.match_metrics
            .attempt_duration
            .with_label_values(&[kind.label()])
            .observe(duration.as_secs_f64());
    }

    pub fn record_group_created(&self) {
        self.match_metrics.groups_created_total.inc();
    }

    pub fn record_group_creation_failed(&self) {
        self.match_metrics.group_creation_failures_total.inc();
    }

    pub fn record_member_added(&self) {
        self.match_metrics.members_added_total.inc();
    }

    pub fn record_channel_removal(&self) {
        self.match_metrics.channel_removals_total.inc();
    }

    /// Record a listing response
    pub fn record_listing(&self, found: u32, displayed: u32) {
        self.listing_metrics.queries_total.inc();
        self.listing_metrics.found_per_query.observe(found as f64);
        if found > displayed {
            self.listing_metrics.truncated_total.inc();
        }
    }

    /// Record a handled client request
    pub fn record_request(&self, request: &str) {
        self.service_metrics
            .requests_total
            .with_label_values(&[request])
            .inc();
    }

    pub fn update_online_characters(&self, count: usize) {
        self.service_metrics.online_characters.set(count as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new("lfg_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let requests_total = IntCounterVec::new(
            Opts::new("lfg_requests_total", "Client LFG requests handled"),
            &["request"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let online_characters =
            IntGauge::new("lfg_online_characters", "Characters currently online")?;
        registry.register(Box::new(online_characters.clone()))?;

        let health_status = IntGauge::new(
            "lfg_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            requests_total,
            online_characters,
            health_status,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let attempts_total = IntCounterVec::new(
            Opts::new("lfg_match_attempts_total", "Match attempts by kind and outcome"),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(attempts_total.clone()))?;

        let groups_created_total =
            IntCounter::new("lfg_groups_created_total", "Groups created by matching")?;
        registry.register(Box::new(groups_created_total.clone()))?;

        let group_creation_failures_total = IntCounter::new(
            "lfg_group_creation_failures_total",
            "Group creations refused by the group store",
        )?;
        registry.register(Box::new(group_creation_failures_total.clone()))?;

        let members_added_total =
            IntCounter::new("lfg_members_added_total", "Members added by matching")?;
        registry.register(Box::new(members_added_total.clone()))?;

        let channel_removals_total = IntCounter::new(
            "lfg_channel_removals_total",
            "LFG channel removals caused by matching",
        )?;
        registry.register(Box::new(channel_removals_total.clone()))?;

        let attempt_duration = HistogramVec::new(
            HistogramOpts::new(
                "lfg_match_attempt_duration_seconds",
                "Duration of a match attempt scan",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["kind"],
        )?;
        registry.register(Box::new(attempt_duration.clone()))?;

        Ok(Self {
            attempts_total,
            groups_created_total,
            group_creation_failures_total,
            members_added_total,
            channel_removals_total,
            attempt_duration,
        })
    }
}

impl ListingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let queries_total = IntCounter::new("lfg_listing_queries_total", "Listing responses built")?;
        registry.register(Box::new(queries_total.clone()))?;

        let found_per_query = Histogram::with_opts(
            HistogramOpts::new("lfg_listing_found", "Matching characters found per query")
                .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 500.0]),
        )?;
        registry.register(Box::new(found_per_query.clone()))?;

        let truncated_total = IntCounter::new(
            "lfg_listing_truncated_total",
            "Listing responses capped by the display limit",
        )?;
        registry.register(Box::new(truncated_total.clone()))?;

        Ok(Self {
            queries_total,
            found_per_query,
            truncated_total,
        })
    }
}
