//! Error types for the LFG matchmaking service
//!
//! Matching and listing never fail: their outcomes are booleans or silent
//! no-ops. Errors only surface at the edges (request decoding, unknown
//! characters, configuration, lock poisoning).

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("Character not found: {character_id}")]
    PlayerNotFound { character_id: u64 },

    #[error("Scenario error: {message}")]
    ScenarioError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
