//! Wire types shared by the registry, the client and the synthesizer

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// One registered integration, as served by the configuration service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    /// Unique lowercase slug used for routing and storage keys
    pub alias: String,
    /// Absolute base URL; empty for placeholder descriptors
    #[serde(default, deserialize_with = "null_as_empty")]
    pub base_url: String,
    /// When set, the integration is embedded as a page instead of asked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// How the portal surfaces an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    /// Invoked through the `/ask` protocol at chat time
    Assistant,
    /// Rendered as an embedded external page
    Application,
}

impl AgentDescriptor {
    pub fn new(alias: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            base_url: base_url.into(),
            domain_url: None,
            icon: None,
            display_order: 0,
            is_active: true,
        }
    }

    pub fn with_domain_url(mut self, domain_url: impl Into<String>) -> Self {
        self.domain_url = Some(domain_url.into());
        self
    }

    pub fn with_display_order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }

    pub fn kind(&self) -> IntegrationKind {
        match self.domain_url.as_deref() {
            Some(url) if !url.trim().is_empty() => IntegrationKind::Application,
            _ => IntegrationKind::Assistant,
        }
    }

    /// Whether the descriptor can be reached over HTTP at all
    pub fn is_callable(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// Build `{baseUrl}/{path}`
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Body POSTed to an agent's `/ask` endpoint.
///
/// Unknown fields are carried in `extra` and flattened onto the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AskPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Loosely validated `/ask` response body.
///
/// Built from any JSON value without failing: a string `answer` and an
/// array `sources` are lifted out, everything else stays in `extra`.
/// Non-object bodies become the empty response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct AskResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AskResponse {
    /// Parse a raw response body; unparsable bytes yield the empty response
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice::<Value>(body)
            .map(Self::from)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_none() && self.sources.is_none() && self.extra.is_empty()
    }
}

impl From<Value> for AskResponse {
    fn from(value: Value) -> Self {
        let Value::Object(mut extra) = value else {
            return Self::default();
        };

        let answer = match extra.remove("answer") {
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                extra.insert("answer".to_string(), other);
                None
            }
            None => None,
        };
        let sources = match extra.remove("sources") {
            Some(Value::Array(items)) => Some(items),
            Some(other) => {
                extra.insert("sources".to_string(), other);
                None
            }
            None => None,
        };

        Self {
            answer,
            sources,
            extra,
        }
    }
}

/// Settled result of one logical `ask` call
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Ok(AskResponse),
    Err(String),
}

/// Result of one `ask` invocation, success or failure.
///
/// Serializes as `{alias, ok, timeMs, data?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReply", into = "WireReply")]
pub struct AgentReply {
    pub alias: String,
    /// Wall-clock time for the whole call, retries included
    pub time_ms: u64,
    pub outcome: ReplyOutcome,
}

impl AgentReply {
    pub fn success(alias: impl Into<String>, time_ms: u64, data: AskResponse) -> Self {
        Self {
            alias: alias.into(),
            time_ms,
            outcome: ReplyOutcome::Ok(data),
        }
    }

    /// A failed reply. An empty message is replaced so `error` is never blank.
    pub fn failure(alias: impl Into<String>, time_ms: u64, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }
        Self {
            alias: alias.into(),
            time_ms,
            outcome: ReplyOutcome::Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ReplyOutcome::Ok(_))
    }

    pub fn data(&self) -> Option<&AskResponse> {
        match &self.outcome {
            ReplyOutcome::Ok(data) => Some(data),
            ReplyOutcome::Err(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ReplyOutcome::Ok(_) => None,
            ReplyOutcome::Err(error) => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReply {
    alias: String,
    ok: bool,
    #[serde(default)]
    time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<AskResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<AgentReply> for WireReply {
    fn from(reply: AgentReply) -> Self {
        let (ok, data, error) = match reply.outcome {
            ReplyOutcome::Ok(data) => (true, Some(data), None),
            ReplyOutcome::Err(error) => (false, None, Some(error)),
        };
        Self {
            alias: reply.alias,
            ok,
            time_ms: reply.time_ms,
            data,
            error,
        }
    }
}

impl TryFrom<WireReply> for AgentReply {
    type Error = String;

    fn try_from(wire: WireReply) -> Result<Self, Self::Error> {
        if wire.ok {
            return Ok(AgentReply::success(
                wire.alias,
                wire.time_ms,
                wire.data.unwrap_or_default(),
            ));
        }
        match wire.error {
            Some(error) if !error.trim().is_empty() => {
                Ok(AgentReply::failure(wire.alias, wire.time_ms, error))
            }
            _ => Err(format!("failed reply for '{}' carries no error", wire.alias)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_descriptor_from_config_service() {
        let descriptor: AgentDescriptor = serde_json::from_value(json!({
            "alias": "research",
            "baseUrl": "http://agents.local/research",
            "icon": "book",
            "displayOrder": 3,
            "isActive": false,
            "createdAt": "2024-01-01"
        }))
        .unwrap();

        assert_eq!(descriptor.alias, "research");
        assert_eq!(descriptor.base_url, "http://agents.local/research");
        assert_eq!(descriptor.display_order, 3);
        assert!(!descriptor.is_active);
        assert_eq!(descriptor.kind(), IntegrationKind::Assistant);
    }

    #[test]
    fn test_descriptor_null_base_url() {
        let descriptor: AgentDescriptor =
            serde_json::from_value(json!({ "alias": "placeholder", "baseUrl": null })).unwrap();
        assert_eq!(descriptor.base_url, "");
        assert!(!descriptor.is_callable());
        assert!(descriptor.is_active);
    }

    #[test]
    fn test_descriptor_kind() {
        let app = AgentDescriptor::new("docs", "http://docs.local")
            .with_domain_url("https://docs.example.com");
        assert_eq!(app.kind(), IntegrationKind::Application);

        let blank = AgentDescriptor::new("chat", "http://chat.local").with_domain_url("  ");
        assert_eq!(blank.kind(), IntegrationKind::Assistant);
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let descriptor = AgentDescriptor::new("a", "http://agents.local/a/");
        assert_eq!(
            descriptor.endpoint("ask").unwrap().as_str(),
            "http://agents.local/a/ask"
        );
        assert_eq!(
            descriptor.endpoint("/metadata").unwrap().as_str(),
            "http://agents.local/a/metadata"
        );
        assert!(AgentDescriptor::new("b", "not a url").endpoint("ask").is_err());
    }

    #[test]
    fn test_payload_wire_format() {
        let mut payload = AskPayload::new("hello")
            .with_session("s-1")
            .with_context(json!({ "lang": "vi" }));
        payload.extra.insert("channel".into(), json!("web"));

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "session_id": "s-1",
                "prompt": "hello",
                "context": { "lang": "vi" },
                "channel": "web"
            })
        );
    }

    #[test]
    fn test_ask_response_lifts_known_fields() {
        let response = AskResponse::from(json!({
            "answer": "42",
            "sources": [{ "title": "guide" }],
            "confidence": 0.9
        }));
        assert_eq!(response.answer.as_deref(), Some("42"));
        assert_eq!(response.sources, Some(vec![json!({ "title": "guide" })]));
        assert_eq!(response.extra.get("confidence"), Some(&json!(0.9)));
    }

    #[test]
    fn test_ask_response_degrades_wrong_shapes() {
        let response = AskResponse::from(json!({ "answer": 7, "sources": "none" }));
        assert_eq!(response.answer, None);
        assert_eq!(response.sources, None);
        // Passed through untouched
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "answer": 7, "sources": "none" })
        );

        assert!(AskResponse::from(json!(["a", "b"])).is_empty());
        assert!(AskResponse::from_body(b"<html>oops</html>").is_empty());
        assert!(AskResponse::from_body(b"").is_empty());
    }

    #[test]
    fn test_reply_wire_shape() {
        let ok = AgentReply::success("a", 50, AskResponse::from(json!({ "answer": "X" })));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "alias": "a", "ok": true, "timeMs": 50, "data": { "answer": "X" } })
        );

        let failed = AgentReply::failure("b", 0, "HTTP 500");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "alias": "b", "ok": false, "timeMs": 0, "error": "HTTP 500" })
        );
    }

    #[test]
    fn test_reply_exactly_one_outcome() {
        let replies = vec![
            AgentReply::success("a", 1, AskResponse::default()),
            AgentReply::failure("b", 2, ""),
            AgentReply::failure("c", 3, "boom"),
        ];
        for reply in &replies {
            assert!(reply.is_ok() != reply.error().is_some());
            assert!(reply.is_ok() == reply.data().is_some());
            if let Some(error) = reply.error() {
                assert!(!error.is_empty());
            }
        }
    }

    #[test]
    fn test_reply_rejects_failure_without_error() {
        let parsed: Result<AgentReply, _> =
            serde_json::from_value(json!({ "alias": "a", "ok": false, "timeMs": 5 }));
        assert!(parsed.is_err());

        let parsed: AgentReply =
            serde_json::from_value(json!({ "alias": "a", "ok": true, "timeMs": 5 })).unwrap();
        assert_eq!(parsed.data(), Some(&AskResponse::default()));
    }
}
