//! Error types for the chat engine

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by the inference engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request payload rejected before any model interaction
    #[error("{message}")]
    InputError {
        /// Human-readable rejection reason
        message: String,
    },

    /// Primary model artifacts are missing or unreadable
    #[error("Model artifacts unavailable at {}: {}", .path.display(), .reason)]
    ArtifactError {
        /// Directory that was probed
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Model or tokenizer could not be loaded
    #[error("Model error: {message}")]
    ModelError {
        /// Description of the load failure
        message: String,
    },

    /// Failure while generating or decoding tokens
    #[error("Generation failed: {message}")]
    DecodeError {
        /// Description of the runtime failure
        message: String,
    },

    /// Rejected configuration or generation parameter
    #[error("Configuration error for {parameter}: {message}")]
    ConfigurationError {
        /// Why the value was rejected
        message: String,
        /// Name of the offending parameter
        parameter: String,
    },
}

/// Extension trait for error handling utilities
pub(crate) trait ErrorExt {
    /// Whether the baseline model may be substituted for this failure
    fn allows_fallback(&self) -> bool;
}

impl ErrorExt for EngineError {
    fn allows_fallback(&self) -> bool {
        matches!(self, EngineError::ArtifactError { .. })
    }
}
