//! Error types for the nestling_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nestling_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required reference data or record is absent for the given key.
    ///
    /// Distinct from an empty computed result: a day with no events is an
    /// empty summary, while a missing growth reference row or weight record
    /// is this error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller passed input that is rejected before computation begins
    /// (e.g. a record category that carries no duration, or an inverted
    /// time range).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record journal error
    #[error("Journal error: {0}")]
    Journal(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
