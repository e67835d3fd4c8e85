//! Error types for control system operations.
//!
//! Node evaluation never fails; only construction, configuration and task
//! spawning report errors.

use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control system operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// The periodic task backing an output could not be started.
    #[error("Failed to spawn periodic task '{name}': {what}")]
    Spawn { name: String, what: String },

    /// The output is already driven by another periodic task.
    #[error("Output '{name}' is already enabled")]
    AlreadyEnabled { name: String },

    /// Loop configuration rejected.
    #[error("Invalid configuration: {what}")]
    Config { what: String },
}

impl From<cg_core::CoreError> for ControlError {
    fn from(err: cg_core::CoreError) -> Self {
        match err {
            cg_core::CoreError::InvalidArg { what } => Self::InvalidArg { what },
            other => Self::Config {
                what: other.to_string(),
            },
        }
    }
}
