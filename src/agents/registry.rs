//! Agent registry: the cached set of known integrations
//!
//! Descriptors are fetched from a `ConfigSource` on first use and cached for
//! the life of the registry. Updates are only observed after `invalidate()`
//! or `refresh()`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

use super::types::{AgentDescriptor, IntegrationKind};
use crate::config::ClientConfig;
use crate::error::RegistryError;

/// Upstream that owns the agent configuration list
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<AgentDescriptor>>;
}

/// Fixed in-memory list, e.g. from config.toml
pub struct StaticConfigSource {
    agents: Vec<AgentDescriptor>,
}

impl StaticConfigSource {
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self) -> Result<Vec<AgentDescriptor>> {
        Ok(self.agents.clone())
    }
}

/// The backend's configuration endpoint
pub struct HttpConfigSource {
    http_client: reqwest::Client,
    url: Url,
    bearer_token: Option<String>,
}

/// The service answers with either a bare list or `{ "agents": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigListing {
    List(Vec<AgentDescriptor>),
    Wrapped { agents: Vec<AgentDescriptor> },
}

impl HttpConfigSource {
    pub fn new(url: &str, config: &ClientConfig) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid registry URL: {}", url))?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            url,
            bearer_token: config.bearer_token.clone(),
        })
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<Vec<AgentDescriptor>> {
        let mut request = self.http_client.get(self.url.clone());
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach configuration service at {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("configuration service returned HTTP {}", status.as_u16());
        }

        let listing: ConfigListing = response
            .json()
            .await
            .context("Failed to parse agent configuration list")?;

        Ok(match listing {
            ConfigListing::List(agents) | ConfigListing::Wrapped { agents } => agents,
        })
    }
}

struct Snapshot {
    agents: Arc<[AgentDescriptor]>,
    /// Set by `invalidate()`; the next read refetches. Cleared after any
    /// refetch attempt, successful or not.
    stale: bool,
}

/// Registry of agent descriptors, shared as `Arc<AgentRegistry>`
pub struct AgentRegistry {
    source: Arc<dyn ConfigSource>,
    cache: RwLock<Option<Snapshot>>,
    /// Held for the duration of an upstream fetch
    loading: Mutex<()>,
}

impl AgentRegistry {
    /// Create a registry that loads lazily from `source`
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            cache: RwLock::new(None),
            loading: Mutex::new(()),
        }
    }

    /// Registry over a fixed list of descriptors
    pub fn from_agents(agents: Vec<AgentDescriptor>) -> Self {
        Self::new(StaticConfigSource::new(agents))
    }

    /// All known descriptors.
    ///
    /// Fails only when nothing has ever been loaded and the source is
    /// unreachable; a stale cache is served instead of failing.
    pub async fn configs(&self) -> Result<Arc<[AgentDescriptor]>, RegistryError> {
        if let Some(agents) = self.cached().await {
            return Ok(agents);
        }

        let _loading = self.loading.lock().await;
        // Another caller may have finished loading while we waited
        if let Some(agents) = self.cached().await {
            return Ok(agents);
        }
        self.load().await
    }

    /// Refetch now, regardless of cache state
    pub async fn refresh(&self) -> Result<Arc<[AgentDescriptor]>, RegistryError> {
        let _loading = self.loading.lock().await;
        self.load().await
    }

    /// Mark the cache stale so the next read refetches
    pub async fn invalidate(&self) {
        if let Some(snapshot) = self.cache.write().await.as_mut() {
            debug!("Agent registry invalidated");
            snapshot.stale = true;
        }
    }

    /// Whether a list has been loaded at least once
    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Exact, case-sensitive alias lookup. Unknown aliases are `Ok(None)`.
    pub async fn resolve(&self, alias: &str) -> Result<Option<AgentDescriptor>, RegistryError> {
        Ok(self
            .configs()
            .await?
            .iter()
            .find(|d| d.alias == alias)
            .cloned())
    }

    /// Active descriptors ordered by display order, then alias
    pub async fn active(&self) -> Result<Vec<AgentDescriptor>, RegistryError> {
        let mut agents: Vec<AgentDescriptor> = self
            .configs()
            .await?
            .iter()
            .filter(|d| d.is_active)
            .cloned()
            .collect();
        agents.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.alias.cmp(&b.alias))
        });
        Ok(agents)
    }

    /// Active integrations invoked through `/ask`
    pub async fn assistants(&self) -> Result<Vec<AgentDescriptor>, RegistryError> {
        self.active_of_kind(IntegrationKind::Assistant).await
    }

    /// Active integrations rendered as embedded pages
    pub async fn applications(&self) -> Result<Vec<AgentDescriptor>, RegistryError> {
        self.active_of_kind(IntegrationKind::Application).await
    }

    async fn active_of_kind(
        &self,
        kind: IntegrationKind,
    ) -> Result<Vec<AgentDescriptor>, RegistryError> {
        let mut agents = self.active().await?;
        agents.retain(|d| d.kind() == kind);
        Ok(agents)
    }

    async fn cached(&self) -> Option<Arc<[AgentDescriptor]>> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|s| !s.stale)
            .map(|s| s.agents.clone())
    }

    /// Callers must hold `loading`
    async fn load(&self) -> Result<Arc<[AgentDescriptor]>, RegistryError> {
        let fetched = self.source.fetch().await;
        let mut cache = self.cache.write().await;
        match fetched {
            Ok(agents) => {
                info!("Loaded {} agent descriptors", agents.len());
                let agents: Arc<[AgentDescriptor]> = agents.into();
                *cache = Some(Snapshot {
                    agents: agents.clone(),
                    stale: false,
                });
                Ok(agents)
            }
            Err(e) => match cache.as_mut() {
                Some(snapshot) => {
                    // Keep serving the old list until the next invalidate or refresh
                    warn!("Agent registry refresh failed, serving cached list: {:#}", e);
                    snapshot.stale = false;
                    Ok(snapshot.agents.clone())
                }
                None => {
                    error!("Agent registry load failed: {:#}", e);
                    Err(RegistryError::Unavailable(format!("{:#}", e)))
                }
            },
        }
    }
}
