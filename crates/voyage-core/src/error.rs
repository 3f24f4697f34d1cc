//! Unified error types for Voyage

use thiserror::Error;

/// Unified error type for all Voyage operations
#[derive(Error, Debug)]
pub enum VoyageError {
    // Transport errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    // Response shape errors
    #[error("Invalid response: {0}")]
    Validation(String),

    // Generative-AI errors
    #[error("Generation failed: {0}")]
    Generation(String),

    /// An operation ran out of attempts; carries the last underlying cause
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<VoyageError>,
    },

    // Startup errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Account data error: {0}")]
    Accounts(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl VoyageError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Setup errors (bad proxy URI, bad account data) fail the same way every
    /// time, so the resilient client gives up on them immediately.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            VoyageError::Config(_) | VoyageError::Accounts(_) | VoyageError::Exhausted { .. }
        )
    }

    /// Innermost cause, looking through `Exhausted` wrappers
    pub fn root_cause(&self) -> &VoyageError {
        match self {
            VoyageError::Exhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias using VoyageError
pub type Result<T> = std::result::Result<T, VoyageError>;
