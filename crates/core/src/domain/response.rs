use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::tool::ToolDecision;

/// Attribution for a retrieved passage that informed an answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSourceRef")]
pub struct SourceRef {
    pub title: String,
    pub locator: String,
    pub snippet: String,
}

impl SourceRef {
    pub fn new(
        title: impl Into<String>,
        locator: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self { title: title.into(), locator: locator.into(), snippet: snippet.into() }
    }
}

// Backends in the wild send `page` or `doc_id` where we expect `locator`.
#[derive(Deserialize)]
struct RawSourceRef {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    locator: Option<Value>,
    #[serde(default)]
    page: Option<Value>,
    #[serde(default)]
    doc_id: Option<Value>,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<RawSourceRef> for SourceRef {
    fn from(raw: RawSourceRef) -> Self {
        let locator = [raw.locator, raw.page, raw.doc_id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                Value::String(text) => Some(text),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_default();

        Self {
            title: raw.title.unwrap_or_default(),
            locator,
            snippet: raw.snippet.unwrap_or_default(),
        }
    }
}

/// Output of one RAG invocation. `latency_ms` is always set by a local
/// pipeline run but may be absent when a remote backend omits it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub latency_ms: Option<u64>,
}

/// The single response shape returned to callers, whatever tool ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub tool_used: ToolDecision,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub latency_ms: Option<u64>,
    pub trace_id: String,
}

impl ResponseEnvelope {
    pub fn rag(result: RagResult, trace_id: impl Into<String>) -> Self {
        Self {
            tool_used: ToolDecision::Rag,
            answer: result.answer,
            sources: result.sources,
            latency_ms: result.latency_ms,
            trace_id: trace_id.into(),
        }
    }

    /// Envelope without attribution, used by placeholder tools and stubbed
    /// pipelines. Never carries sources or latency.
    pub fn unattributed(
        tool_used: ToolDecision,
        answer: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_used,
            answer: answer.into(),
            sources: Vec::new(),
            latency_ms: None,
            trace_id: trace_id.into(),
        }
    }
}

pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}
