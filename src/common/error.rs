//! Error types for rust_footstep_planning

use thiserror::Error;

/// Main error type for footstep planning
///
/// Only the API boundary produces these: request validation and
/// configuration loading. Steady-state planning reports "no progress"
/// through an empty plan instead.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Malformed planning request (non-finite pose, bad goal margin, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Invalid tunable
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Planning or walking state machine failure
    #[error("Planning error: {0}")]
    Planning(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),
    /// Visualization error
    #[error("Visualization error: {0}")]
    Visualization(String),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
