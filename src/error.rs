//! Error types for Nestling Rhythm
//!
//! Errors only surface at the edges (parsing input JSON, encoding output).
//! The computation stages themselves fail soft and never return errors.

use thiserror::Error;

/// Errors that can occur while reading input or writing output
#[derive(Debug, Error)]
pub enum RhythmError {
    #[error("Failed to parse activity payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
