//! Agent Portal - integration core for externally hosted assistants
//!
//! Discovers agents through a cached registry, calls their `/ask` endpoint
//! with a bounded timeout and retry budget, and merges the replies of one
//! chat turn into a single answer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agent_portal::{AgentClient, AgentDescriptor, AgentRegistry, AskPayload, ClientConfig, Synthesizer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(AgentRegistry::from_agents(vec![
//!         AgentDescriptor::new("research", "http://localhost:8001"),
//!         AgentDescriptor::new("writer", "http://localhost:8002"),
//!     ]));
//!     let client = AgentClient::new(registry, ClientConfig::default())?;
//!
//!     let payload = AskPayload::new("Summarize the latest report").with_session("s-1");
//!     let answer = client
//!         .turn(&["research", "writer"], &payload, &Synthesizer::default())
//!         .await;
//!
//!     println!("{}", answer.summary);
//!     if let Some(best) = answer.meta.best_alias {
//!         println!("fastest: {} ({}ms total)", best, answer.meta.latency_ms);
//!     }
//!     Ok(())
//! }
//! ```

mod agents;
mod config;
mod error;

// Re-export the public API
pub use agents::*;
pub use config::{ClientConfig, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
#[cfg(feature = "cli")]
pub use config::{ClientSettings, Config, RegistryConfig, SynthesisConfig};
pub use error::{AskError, DataError, MetadataError, RegistryError};
