//! Agent integration protocol: registry, client and answer synthesis

mod client;
mod metadata;
mod registry;
mod synthesizer;
mod types;

pub use client::{AgentClient, IDEMPOTENCY_HEADER, NOT_FOUND_ERROR};
pub use metadata::{AgentMetadata, Health, HealthReport, MetadataStatus, ModelInfo, ProvidedDataType};
pub use registry::{AgentRegistry, ConfigSource, HttpConfigSource, StaticConfigSource};
pub use synthesizer::{
    synthesize, AnswerPart, SynthesisMeta, SynthesizedAnswer, Synthesizer, FAILURE_SUMMARY,
    PLACEHOLDER_ANSWER,
};
pub use types::{AgentDescriptor, AgentReply, AskPayload, AskResponse, IntegrationKind, ReplyOutcome};
