//! Error types for sitrep-providers

use sitrep_core::GatherResult;
use thiserror::Error;

/// Errors raised while talking to a provider's tool or API.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// External binary not on PATH
    #[error("{0} not installed")]
    ToolMissing(String),

    /// Tool ran but is not logged in
    #[error("{0} not authenticated")]
    NotAuthenticated(String),

    /// Source directory lacks the tool's metadata
    #[error("{0} not initialised")]
    NotInitialised(String),

    /// Tool exited non-zero
    #[error("{tool} exited with {code}: {stderr}")]
    CommandFailed {
        tool: String,
        code: String,
        stderr: String,
    },

    /// Remote rejected the configured credentials
    #[error("{0} rejected credentials")]
    Unauthorized(String),

    #[error("rate limited")]
    RateLimited,

    /// Unexpected HTTP status
    #[error("{service} returned HTTP {status}")]
    Status { service: String, status: u16 },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote reported errors in an otherwise valid response
    #[error("{0}")]
    Remote(String),

    /// Output could not be understood
    #[error("unexpected output: {0}")]
    Parse(String),

    #[error("unknown provider kind '{0}'")]
    UnknownKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err.to_string())
    }
}

impl From<ProviderError> for GatherResult {
    /// Absent or unconfigured tooling is `Unavailable`; everything else is `Error`.
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ToolMissing(_)
            | ProviderError::NotAuthenticated(_)
            | ProviderError::NotInitialised(_) => GatherResult::unavailable(err.to_string()),
            other => GatherResult::error(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tooling_is_unavailable() {
        let result: GatherResult = ProviderError::ToolMissing("gh".to_string()).into();
        assert_eq!(result, GatherResult::unavailable("gh not installed"));

        let result: GatherResult = ProviderError::NotInitialised("beads".to_string()).into();
        assert_eq!(result, GatherResult::unavailable("beads not initialised"));
    }

    #[test]
    fn test_failures_are_errors() {
        let result: GatherResult = ProviderError::Unauthorized("linear".to_string()).into();
        assert_eq!(result, GatherResult::error("linear rejected credentials"));

        let result: GatherResult = ProviderError::RateLimited.into();
        assert_eq!(result, GatherResult::error("rate limited"));
    }
}
