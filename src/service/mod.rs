//! Service layer for the LFG matchmaking service
//!
//! Application state wiring, health checks and offline scenario replay.

pub mod app;
pub mod health;
pub mod scenario;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthProbe, HealthStatus};
pub use scenario::{Scenario, ScenarioReport};
