//! Error types for the matchmaking service
//!
//! This module defines the crate-level error types. Service and bootstrap code
//! uses anyhow for propagation; component errors are typed with thiserror.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Errors raised while assembling the service from its inputs
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}
