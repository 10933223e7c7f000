//! Domain-level error taxonomy for sitrep.
//!
//! Only pre-flight problems live here. Per-source failures are never errors
//! at this level: they are captured as [`GatherResult`](super::GatherResult)
//! variants and carried into the report.

/// Errors produced while parsing a time window expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidWindowError {
    #[error("window expression must not be empty")]
    Empty,

    #[error("window expression '{expr}' must look like <integer><h|d|w>, e.g. 24h, 7d, 2w")]
    Malformed { expr: String },

    #[error("window expression '{expr}' has unknown unit '{unit}' (expected h, d or w)")]
    UnknownUnit { expr: String, unit: char },

    #[error("window expression '{expr}' must be greater than zero")]
    Zero { expr: String },

    #[error("window expression '{expr}' is too large")]
    Overflow { expr: String },
}

/// sitrep core errors.
#[derive(Debug, thiserror::Error)]
pub enum SitrepError {
    #[error("invalid window: {0}")]
    InvalidWindow(#[from] InvalidWindowError),

    #[error("duplicate source id: {0}")]
    DuplicateSource(String),

    #[error("invalid identifier pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for sitrep core operations.
pub type Result<T> = std::result::Result<T, SitrepError>;
