//! Error types for the reaction lab.
//!
//! All errors are strongly typed using thiserror. Unknown reagents and
//! unmatched petri drops are not errors; they are permissive no-ops handled
//! by the engine. Errors only surface at the ingestion boundary (malformed
//! identifiers, bad configuration) and from the threaded runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Validation errors raised while parsing external input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Reagent identifier cannot be empty")]
    EmptyReagent,

    #[error("Reagent identifier '{id}' exceeds maximum length of {max_length}")]
    ReagentTooLong {
        id: String,
        max_length: usize,
    },

    #[error("Reagent identifier '{id}' is not a chemical symbol or formula")]
    MalformedReagent {
        id: String,
    },

    #[error("Unknown drop zone '{zone}' (expected 'beaker' or 'petri')")]
    UnknownZone {
        zone: String,
    },
}

/// Errors raised while loading or validating a catalogue.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read catalogue {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalogue: {message}")]
    Parse {
        message: String,
    },

    #[error("Reaction rule pairs '{reagent}' with itself")]
    SelfPair {
        reagent: String,
    },

    #[error("Duplicate reaction rule for {first} + {second}")]
    DuplicateRule {
        first: String,
        second: String,
    },

    #[error("Invalid effect timing for {rule}: {reason}")]
    InvalidTiming {
        rule: String,
        reason: String,
    },
}

/// Errors from the threaded runtime host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Runtime channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Command queue is full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for the reaction lab.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl LabError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a runtime error.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Runtime(e) => matches!(
                e,
                RuntimeError::QueueFull { .. } | RuntimeError::Timeout { .. }
            ),
            Self::Validation(_) | Self::Config(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for lab operations.
pub type LabResult<T> = Result<T, LabError>;
