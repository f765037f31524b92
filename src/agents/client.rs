//! HTTP client for the agent protocol (`/ask`, `/metadata`, `/data`)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::RequestBuilder;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::metadata::{AgentMetadata, Health, HealthReport};
use super::registry::AgentRegistry;
use super::synthesizer::{SynthesizedAnswer, Synthesizer};
use super::types::{AgentDescriptor, AgentReply, AskPayload, AskResponse};
use crate::config::ClientConfig;
use crate::error::{AskError, DataError, MetadataError, RegistryError};

/// Error for aliases that cannot be called; terminal, never retried
pub const NOT_FOUND_ERROR: &str = "Agent not found or no baseUrl";

/// Same value on every attempt of one logical `ask`
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Calls agents resolved through a shared registry
pub struct AgentClient {
    registry: Arc<AgentRegistry>,
    http_client: reqwest::Client,
    config: ClientConfig,
    health: RwLock<HashMap<String, Health>>,
}

impl AgentClient {
    pub fn new(registry: Arc<AgentRegistry>, config: ClientConfig) -> Result<Self> {
        // Timeouts are applied per attempt, not on the client
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            registry,
            http_client,
            config,
            health: RwLock::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Ask an agent with the configured retry budget
    pub async fn ask(&self, alias: &str, payload: &AskPayload) -> AgentReply {
        self.ask_with_retries(alias, payload, self.config.max_retries)
            .await
    }

    /// Ask an agent, making at most `retries + 1` attempts.
    ///
    /// Never fails: every path settles into an `AgentReply`. HTTP errors,
    /// transport errors and timeouts are retried immediately; a 2xx with
    /// an unreadable body is a success with empty data.
    pub async fn ask_with_retries(
        &self,
        alias: &str,
        payload: &AskPayload,
        retries: u32,
    ) -> AgentReply {
        let descriptor = match self.registry.resolve(alias).await {
            Ok(Some(descriptor)) if descriptor.is_callable() => descriptor,
            Ok(_) => {
                debug!("Agent '{}' not found or has no baseUrl", alias);
                return AgentReply::failure(alias, 0, NOT_FOUND_ERROR);
            }
            Err(e) => {
                error!("Cannot resolve agent '{}': {}", alias, e);
                return AgentReply::failure(alias, 0, e.to_string());
            }
        };

        let started = Instant::now();
        let idempotency_key = Uuid::new_v4().to_string();
        let mut last_error = None;

        for attempt in 0..=retries {
            match self.attempt_ask(&descriptor, payload, &idempotency_key).await {
                Ok(data) => {
                    let elapsed = elapsed_ms(started);
                    debug!(
                        "Agent '{}' answered in {}ms (attempt {})",
                        alias,
                        elapsed,
                        attempt + 1
                    );
                    return AgentReply::success(alias, elapsed, data);
                }
                Err(e) => {
                    warn!(
                        "Agent '{}' attempt {}/{} failed: {}",
                        alias,
                        attempt + 1,
                        retries + 1,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let elapsed = elapsed_ms(started);
        let error = last_error.map(|e| e.to_string()).unwrap_or_default();
        error!("Agent '{}' failed after {}ms: {}", alias, elapsed, error);
        AgentReply::failure(alias, elapsed, error)
    }

    /// Ask several agents concurrently and wait for all of them.
    /// Replies are returned in the order of `aliases`.
    pub async fn ask_many<S: AsRef<str>>(
        &self,
        aliases: &[S],
        payload: &AskPayload,
    ) -> Vec<AgentReply> {
        join_all(aliases.iter().map(|alias| self.ask(alias.as_ref(), payload))).await
    }

    /// One chat turn: fan out, wait for everyone, merge
    pub async fn turn<S: AsRef<str>>(
        &self,
        aliases: &[S],
        payload: &AskPayload,
        synthesizer: &Synthesizer,
    ) -> SynthesizedAnswer {
        let replies = self.ask_many(aliases, payload).await;
        synthesizer.synthesize(&replies)
    }

    async fn attempt_ask(
        &self,
        descriptor: &AgentDescriptor,
        payload: &AskPayload,
        idempotency_key: &str,
    ) -> Result<AskResponse, AskError> {
        let url = descriptor.endpoint("ask").map_err(|e| {
            AskError::Transport(format!("invalid agent URL '{}': {}", descriptor.base_url, e))
        })?;
        let request = self
            .authorize(self.http_client.post(url))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(payload);

        // Dropping the send future on timeout aborts the connection
        tokio::time::timeout(self.config.timeout, send_ask(request))
            .await
            .map_err(|_| AskError::Timeout(self.config.timeout))?
    }

    /// Probe one agent's `/metadata` and record its health
    pub async fn check_health(&self, alias: &str) -> HealthReport {
        match self.registry.resolve(alias).await {
            Ok(Some(descriptor)) => {
                let report = self.check_descriptor(&descriptor).await;
                self.record_health(&report).await;
                report
            }
            // Unregistered aliases are reported but never tracked
            Ok(None) => HealthReport::from_probe(alias, Err(MetadataError::NotFound(alias.into()))),
            Err(e) => HealthReport::from_probe(alias, Err(e.into())),
        }
    }

    /// Probe every registered agent that has a base URL, concurrently
    pub async fn check_all(&self) -> Result<Vec<HealthReport>, RegistryError> {
        let agents = self.registry.configs().await?;
        let reports = join_all(
            agents
                .iter()
                .filter(|d| d.is_callable())
                .map(|d| self.check_descriptor(d)),
        )
        .await;

        for report in &reports {
            self.record_health(report).await;
        }
        Ok(reports)
    }

    /// Last observed health; `Unknown` until the agent has been probed
    pub async fn health(&self, alias: &str) -> Health {
        self.health
            .read()
            .await
            .get(alias)
            .copied()
            .unwrap_or_default()
    }

    /// Fetch and validate an agent's live metadata
    pub async fn metadata(&self, alias: &str) -> Result<AgentMetadata, MetadataError> {
        match self.registry.resolve(alias).await? {
            Some(descriptor) => self.fetch_metadata(&descriptor).await,
            None => Err(MetadataError::NotFound(alias.to_string())),
        }
    }

    /// Free-form listing from the optional `/data` endpoint. Not retried.
    pub async fn data(&self, alias: &str) -> Result<Value, DataError> {
        let descriptor = self
            .registry
            .resolve(alias)
            .await?
            .filter(|d| d.is_callable())
            .ok_or_else(|| DataError::NotFound(alias.to_string()))?;
        let url = descriptor
            .endpoint("data")
            .map_err(|e| DataError::Transport(e.to_string()))?;

        let (status, body) = self
            .timed_get(url)
            .await
            .ok_or(DataError::Timeout(self.config.timeout))?
            .map_err(|e| DataError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(DataError::Status(status));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_descriptor(&self, descriptor: &AgentDescriptor) -> HealthReport {
        let probe = self.fetch_metadata(descriptor).await;
        HealthReport::from_probe(&descriptor.alias, probe)
    }

    async fn fetch_metadata(&self, descriptor: &AgentDescriptor) -> Result<AgentMetadata, MetadataError> {
        if !descriptor.is_callable() {
            return Err(MetadataError::NoBaseUrl);
        }
        let url = descriptor
            .endpoint("metadata")
            .map_err(|e| MetadataError::Transport(e.to_string()))?;

        let (status, body) = self
            .timed_get(url)
            .await
            .ok_or(MetadataError::Timeout(self.config.timeout))?
            .map_err(|e| MetadataError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(MetadataError::Status(status));
        }
        AgentMetadata::from_body(&body)
    }

    /// GET under the per-attempt timeout; `None` means it timed out
    async fn timed_get(&self, url: Url) -> Option<reqwest::Result<(u16, Vec<u8>)>> {
        let request = self.authorize(self.http_client.get(url));
        tokio::time::timeout(self.config.timeout, send_get(request))
            .await
            .ok()
    }

    async fn record_health(&self, report: &HealthReport) {
        let previous = self
            .health
            .write()
            .await
            .insert(report.alias.clone(), report.health);
        if previous != Some(report.health) {
            info!(
                "Agent '{}' health: {:?} -> {:?}",
                report.alias,
                previous.unwrap_or_default(),
                report.health
            );
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.bearer_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn send_ask(request: RequestBuilder) -> Result<AskResponse, AskError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AskError::Status(status.as_u16()));
    }

    // Unreadable bodies count as success with empty data
    match response.bytes().await {
        Ok(body) => Ok(AskResponse::from_body(&body)),
        Err(e) => {
            debug!("Discarding unreadable ask body: {}", e);
            Ok(AskResponse::default())
        }
    }
}

async fn send_get(request: RequestBuilder) -> reqwest::Result<(u16, Vec<u8>)> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    Ok((status, body.to_vec()))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
