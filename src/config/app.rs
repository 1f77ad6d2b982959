//! Main application configuration
//!
//! This module defines the configuration structures for the LFG matchmaking
//! service, including environment variable and TOML file loading and validation.

use crate::error::MatchmakingError;
use crate::types::MAX_GROUP_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub lfg: LfgSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check endpoint
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LfgSettings {
    /// Remove unprivileged characters from the LFG channel once matched
    pub channel_restricted: bool,
    /// Capacity of groups created by the matchmaker
    pub max_group_size: usize,
    /// Entries shown in one listing response (client limit)
    pub listing_display_limit: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "lfg-matchmaker".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for LfgSettings {
    fn default() -> Self {
        Self {
            channel_restricted: false,
            max_group_size: MAX_GROUP_SIZE,
            listing_display_limit: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text without consulting the environment
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| invalid(format!("Invalid configuration file: {}", e)))?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            self.service.health_port = port
                .parse()
                .map_err(|_| invalid(format!("Invalid HEALTH_PORT value: {}", port)))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| {
                    invalid(format!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))
                })?;
        }

        // LFG settings
        if let Ok(restricted) = env::var("LFG_CHANNEL_RESTRICTED") {
            self.lfg.channel_restricted = restricted
                .parse()
                .map_err(|_| {
                    invalid(format!("Invalid LFG_CHANNEL_RESTRICTED value: {}", restricted))
                })?;
        }
        if let Ok(size) = env::var("LFG_MAX_GROUP_SIZE") {
            self.lfg.max_group_size = size
                .parse()
                .map_err(|_| invalid(format!("Invalid LFG_MAX_GROUP_SIZE value: {}", size)))?;
        }
        if let Ok(limit) = env::var("LFG_LISTING_DISPLAY_LIMIT") {
            self.lfg.listing_display_limit = limit
                .parse()
                .map_err(|_| invalid(format!("Invalid LFG_LISTING_DISPLAY_LIMIT value: {}", limit)))?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    MatchmakingError::ConfigurationError {
        message: message.into(),
    }
    .into()
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => {
            return Err(invalid(format!(
                "Invalid log level: {}",
                config.service.log_level
            )))
        }
    }

    if config.service.health_port == 0 {
        return Err(invalid("Health port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(invalid("Shutdown timeout must be greater than 0"));
    }

    // A group needs room for its leader and at least one recruit
    if config.lfg.max_group_size < 2 {
        return Err(invalid(format!(
            "Max group size must be at least 2, got {}",
            config.lfg.max_group_size
        )));
    }
    if config.lfg.listing_display_limit == 0 {
        return Err(invalid("Listing display limit must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.lfg.max_group_size, 5);
        assert_eq!(config.lfg.listing_display_limit, 50);
        assert!(!config.lfg.channel_restricted);
    }

    #[test]
    fn test_toml_partial_override() {
        let config = AppConfig::from_toml_str(
            r#"
            [lfg]
            channel_restricted = true
            "#,
        )
        .unwrap();

        assert!(config.lfg.channel_restricted);
        assert_eq!(config.lfg.max_group_size, 5);
        assert_eq!(config.service.name, "lfg-matchmaker");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.lfg.max_group_size = 1;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.lfg.listing_display_limit = 0;
        assert!(validate_config(&config).is_err());

        assert!(AppConfig::from_toml_str("[lfg]\nmax_group_size = \"five\"").is_err());
    }

    #[test]
    fn test_validation_reports_configuration_error() {
        let mut config = AppConfig::default();
        config.service.health_port = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::ConfigurationError { .. })
        ));
    }
}
