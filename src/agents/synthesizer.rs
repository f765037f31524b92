//! Merging the replies of one chat turn into a single answer

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::AgentReply;

/// Summary shown when no agent answered
pub const FAILURE_SUMMARY: &str =
    "Xin lỗi, hiện chưa có trợ lý nào phản hồi. Vui lòng thử lại sau.";

/// Answer text used when a successful reply carries no `answer` string
pub const PLACEHOLDER_ANSWER: &str = "(Không có nội dung trả lời)";

/// One successful agent's contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPart {
    pub alias: String,
    pub answer: String,
    pub sources: Vec<Value>,
    pub time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisMeta {
    /// Fastest successful agent, for UI emphasis only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_alias: Option<String>,
    pub latency_ms: u64,
    pub replies: Vec<AgentReply>,
}

/// The merged result of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedAnswer {
    pub summary: String,
    pub parts: Vec<AnswerPart>,
    pub meta: SynthesisMeta,
}

/// Merges replies with configurable fallback texts
#[derive(Debug, Clone)]
pub struct Synthesizer {
    failure_summary: String,
    placeholder_answer: String,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self {
            failure_summary: FAILURE_SUMMARY.to_string(),
            placeholder_answer: PLACEHOLDER_ANSWER.to_string(),
        }
    }
}

impl Synthesizer {
    pub fn new(failure_summary: impl Into<String>, placeholder_answer: impl Into<String>) -> Self {
        Self {
            failure_summary: failure_summary.into(),
            placeholder_answer: placeholder_answer.into(),
        }
    }

    /// Merge the replies of one turn. Never fails.
    ///
    /// A single success is shown verbatim. Several successes are listed as
    /// `— ALIAS: answer` blocks in input order, separated by a blank line.
    pub fn synthesize(&self, replies: &[AgentReply]) -> SynthesizedAnswer {
        let parts: Vec<AnswerPart> = replies
            .iter()
            .filter_map(|reply| {
                let data = reply.data()?;
                Some(AnswerPart {
                    alias: reply.alias.clone(),
                    answer: data
                        .answer
                        .clone()
                        .unwrap_or_else(|| self.placeholder_answer.clone()),
                    sources: data.sources.clone().unwrap_or_default(),
                    time_ms: reply.time_ms,
                })
            })
            .collect();

        if parts.is_empty() {
            return SynthesizedAnswer {
                summary: self.failure_summary.clone(),
                parts,
                meta: SynthesisMeta {
                    best_alias: None,
                    latency_ms: replies.iter().map(|r| r.time_ms).max().unwrap_or(0),
                    replies: replies.to_vec(),
                },
            };
        }

        let summary = match parts.as_slice() {
            [only] => only.answer.clone(),
            _ => parts
                .iter()
                .map(|p| format!("— {}: {}", p.alias.to_uppercase(), p.answer))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };

        // min_by_key keeps the first of equal elements
        let best_alias = parts
            .iter()
            .min_by_key(|p| p.time_ms)
            .map(|p| p.alias.clone());
        let latency_ms = parts.iter().map(|p| p.time_ms).max().unwrap_or(0);

        SynthesizedAnswer {
            summary,
            parts,
            meta: SynthesisMeta {
                best_alias,
                latency_ms,
                replies: replies.to_vec(),
            },
        }
    }
}

/// Merge replies with the default texts
pub fn synthesize(replies: &[AgentReply]) -> SynthesizedAnswer {
    Synthesizer::default().synthesize(replies)
}
