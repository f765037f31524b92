//! The `/metadata` descriptor every integration serves, and the health
//! state derived from it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Live descriptor served at `GET {baseUrl}/metadata`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentMetadata {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub developer: Option<String>,
    pub capabilities: Vec<String>,
    pub supported_models: Vec<ModelInfo>,
    pub sample_prompts: Vec<String>,
    pub provided_data_types: Vec<ProvidedDataType>,
    pub contact: Option<String>,
    pub status: MetadataStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_file_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidedDataType {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Self-reported status; anything besides active/inactive is kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum MetadataStatus {
    #[default]
    Active,
    Inactive,
    Other(String),
}

impl From<Option<String>> for MetadataStatus {
    fn from(status: Option<String>) -> Self {
        let Some(status) = status else {
            return MetadataStatus::Active;
        };
        let normalized = status.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "active" | "" => MetadataStatus::Active,
            "inactive" => MetadataStatus::Inactive,
            _ => MetadataStatus::Other(status),
        }
    }
}

impl From<MetadataStatus> for String {
    fn from(status: MetadataStatus) -> Self {
        match status {
            MetadataStatus::Active => "active".to_string(),
            MetadataStatus::Inactive => "inactive".to_string(),
            MetadataStatus::Other(other) => other,
        }
    }
}

impl AgentMetadata {
    /// Parse and validate a raw `/metadata` body
    pub fn from_body(body: &[u8]) -> Result<Self, MetadataError> {
        let metadata: AgentMetadata = serde_json::from_slice(body)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// A descriptor is resolvable only with a non-empty name
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::MissingName);
        }
        Ok(())
    }

    /// Union of accepted file types over all supported models
    pub fn accepted_file_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .supported_models
            .iter()
            .filter_map(|m| m.accepted_file_types.as_ref())
            .flatten()
            .map(String::as_str)
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

/// Health as observed by the client. Advisory only: `ask` ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

/// Outcome of one metadata probe
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub alias: String,
    pub health: Health,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AgentMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn from_probe(alias: impl Into<String>, probe: Result<AgentMetadata, MetadataError>) -> Self {
        let (health, metadata, error) = match probe {
            Ok(metadata) => (Health::Healthy, Some(metadata), None),
            Err(e) => (Health::Unhealthy, None, Some(e.to_string())),
        };
        Self {
            alias: alias.into(),
            health,
            metadata,
            error,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "name": "Research Assistant",
        "description": "Searches internal papers",
        "version": "1.2.0",
        "developer": "Lab",
        "capabilities": ["search", "summarize"],
        "supported_models": [
            {"model_id": "m1", "name": "Fast", "accepted_file_types": ["pdf", "docx"]},
            {"model_id": "m2", "name": "Deep", "accepted_file_types": ["pdf", "txt"]}
        ],
        "sample_prompts": ["Find papers on RAG"],
        "provided_data_types": [{"type": "papers", "description": "Indexed papers"}],
        "contact": "lab@example.com",
        "status": "active"
    }"#;

    #[test]
    fn test_parse_full_metadata() {
        let metadata = AgentMetadata::from_body(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.name, "Research Assistant");
        assert_eq!(metadata.capabilities, vec!["search", "summarize"]);
        assert_eq!(metadata.supported_models.len(), 2);
        assert_eq!(metadata.provided_data_types[0].kind, "papers");
        assert_eq!(metadata.status, MetadataStatus::Active);
        assert_eq!(metadata.accepted_file_types(), vec!["docx", "pdf", "txt"]);
    }

    #[test]
    fn test_minimal_metadata() {
        let metadata = AgentMetadata::from_body(br#"{"name": "Echo"}"#).unwrap();
        assert_eq!(metadata.name, "Echo");
        assert!(metadata.capabilities.is_empty());
        assert_eq!(metadata.status, MetadataStatus::Active);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        assert!(matches!(
            AgentMetadata::from_body(br#"{"description": "nameless"}"#),
            Err(MetadataError::MissingName)
        ));
        assert!(matches!(
            AgentMetadata::from_body(br#"{"name": "   "}"#),
            Err(MetadataError::MissingName)
        ));
    }

    #[test]
    fn test_malformed_metadata() {
        assert!(matches!(
            AgentMetadata::from_body(b"<html>not json</html>"),
            Err(MetadataError::Malformed(_))
        ));
    }

    #[test]
    fn test_status_values() {
        let inactive = AgentMetadata::from_body(br#"{"name": "a", "status": "inactive"}"#).unwrap();
        assert_eq!(inactive.status, MetadataStatus::Inactive);

        let other = AgentMetadata::from_body(br#"{"name": "a", "status": "maintenance"}"#).unwrap();
        assert_eq!(other.status, MetadataStatus::Other("maintenance".to_string()));
        assert_eq!(
            serde_json::to_value(&other).unwrap()["status"],
            serde_json::json!("maintenance")
        );
    }

    #[test]
    fn test_health_report_from_probe() {
        let healthy = HealthReport::from_probe("a", AgentMetadata::from_body(br#"{"name": "A"}"#));
        assert_eq!(healthy.health, Health::Healthy);
        assert!(healthy.error.is_none());

        let unhealthy = HealthReport::from_probe("b", Err(MetadataError::Status(404)));
        assert_eq!(unhealthy.health, Health::Unhealthy);
        assert_eq!(unhealthy.error.as_deref(), Some("metadata endpoint returned HTTP 404"));
        assert!(unhealthy.metadata.is_none());
    }
}
