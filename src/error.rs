//! Error types for the stream-detection pipeline.
//!
//! Every variant aborts the stage that raised it. The only designed fallback
//! is backend selection at configuration time (see [`crate::config`]).

use thiserror::Error;

/// Errors raised by the topology engine and its collaborators.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A feature column has zero (or non-finite) variance and cannot be standardized.
    #[error("Degenerate feature: column {column} has zero variance")]
    DegenerateFeature { column: usize },

    /// Not enough points for the requested neighbor query.
    #[error("Insufficient data: {available} point(s) available, at least {required} required")]
    InsufficientData { available: usize, required: usize },

    /// The accelerator backend was selected but cannot be reached.
    #[error("Accelerator unavailable: {0}")]
    AcceleratorUnavailable(String),

    /// An accelerator kernel returned a nonzero status code.
    #[error("Accelerator error (status {code}): {message}")]
    Accelerator { code: i32, message: String },

    /// The requested homology dimension was not computed.
    #[error("Invalid homology dimension: {requested} (computed up to {max_computed:?})")]
    InvalidHomologyDimension {
        requested: usize,
        max_computed: Option<usize>,
    },

    /// Malformed input (shape mismatch, out-of-range parameter).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StreamError>;
