//! Error types for the agent integration core

use std::time::Duration;

use thiserror::Error;

/// Failure to load the agent configuration list.
///
/// This is the only error allowed to escape to callers: without any
/// configuration no agent can be resolved at all.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("agent registry unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single `ask` attempt. Every variant is retryable.
#[derive(Debug, Error)]
pub enum AskError {
    /// Agent answered with a non-2xx status
    #[error("HTTP {0}")]
    Status(u16),
    /// Network, DNS or connection failure
    #[error("{0}")]
    Transport(String),
    /// Attempt exceeded the per-attempt timeout and was aborted
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl From<reqwest::Error> for AskError {
    fn from(err: reqwest::Error) -> Self {
        AskError::Transport(err.to_string())
    }
}

/// Why an agent's `/metadata` endpoint did not yield a usable descriptor
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("agent not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("agent has no base URL")]
    NoBaseUrl,
    #[error("metadata endpoint returned HTTP {0}")]
    Status(u16),
    #[error("metadata is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("metadata has an empty name")]
    MissingName,
    #[error("metadata request failed: {0}")]
    Transport(String),
    #[error("metadata request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

/// Failure fetching an agent's optional `/data` listing
#[derive(Debug, Error)]
pub enum DataError {
    #[error("agent not found or no baseUrl: {0}")]
    NotFound(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("data endpoint returned HTTP {0}")]
    Status(u16),
    #[error("data is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("data request failed: {0}")]
    Transport(String),
    #[error("data request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}
