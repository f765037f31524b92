//! Configuration loading and validation
//!
//! This module provides:
//! - `ClientConfig` - Runtime configuration for the agent client (library-public)
//! - `Config` - Full application configuration loaded from config.toml (CLI-only)

use std::time::Duration;

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
use crate::agents::{AgentDescriptor, Synthesizer, FAILURE_SUMMARY, PLACEHOLDER_ANSWER};

// =============================================================================
// Library-public types (always available)
// =============================================================================

/// Per-attempt timeout for agent calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Runtime configuration for an `AgentClient`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use agent_portal::ClientConfig;
///
/// let config = ClientConfig {
///     timeout: Duration::from_secs(5),
///     max_retries: 2,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on each individual attempt; the whole call may take
    /// `(max_retries + 1) * timeout`
    pub timeout: Duration,
    pub max_retries: u32,
    /// Sent as `Authorization: Bearer ...` when set
    pub bearer_token: Option<String>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            bearer_token: None,
            user_agent: format!("agent-portal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// =============================================================================
// CLI-only types (gated behind "cli" feature)
// =============================================================================

#[cfg(feature = "cli")]
impl ClientConfig {
    /// Create client config from application Config
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.client.timeout_secs),
            max_retries: config.client.max_retries,
            bearer_token: config.client.bearer_token.clone(),
            ..Default::default()
        }
    }
}

/// Main configuration structure loaded from config.toml
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub client: ClientSettings,
    pub synthesis: SynthesisConfig,
}

#[cfg(feature = "cli")]
impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the config directory path (~/.config/agent-portal)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("agent-portal"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }
}

/// Where agent descriptors come from
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Configuration service endpoint returning the descriptor list
    pub url: Option<String>,
    /// Inline descriptors, used when no url is set
    pub agents: Vec<AgentDescriptor>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub bearer_token: Option<String>,
}

#[cfg(feature = "cli")]
impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
            bearer_token: None,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub failure_summary: String,
    pub placeholder_answer: String,
}

#[cfg(feature = "cli")]
impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            failure_summary: FAILURE_SUMMARY.to_string(),
            placeholder_answer: PLACEHOLDER_ANSWER.to_string(),
        }
    }
}

#[cfg(feature = "cli")]
impl SynthesisConfig {
    pub fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(&self.failure_summary, &self.placeholder_answer)
    }
}
