//! Wire shapes of the RAG service, shared by the service and its clients.

use relay_core::SourceRef;
use serde::{Deserialize, Serialize};

use crate::pipeline::RagOutcome;

/// Name of the tool exposed over the tool-invocation protocol.
pub const ASK_TOOL: &str = "ask";

pub const NOT_IMPLEMENTED_ANSWER: &str = "RAG pipeline is not implemented yet.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskPayload {
    pub question: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    #[default]
    Answered,
    NotImplemented,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskReply {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub status: ReplyStatus,
}

impl From<RagOutcome> for AskReply {
    fn from(outcome: RagOutcome) -> Self {
        match outcome {
            RagOutcome::Answered(result) => Self {
                answer: result.answer,
                sources: result.sources,
                latency_ms: result.latency_ms,
                status: ReplyStatus::Answered,
            },
            RagOutcome::NotImplemented { .. } => Self {
                answer: NOT_IMPLEMENTED_ANSWER.to_string(),
                sources: Vec::new(),
                latency_ms: None,
                status: ReplyStatus::NotImplemented,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_core::{RagResult, SourceRef};

    use super::{AskReply, ReplyStatus, NOT_IMPLEMENTED_ANSWER};
    use crate::pipeline::RagOutcome;
    use crate::PipelineStage;

    #[test]
    fn answered_outcome_keeps_attribution() {
        let reply = AskReply::from(RagOutcome::Answered(RagResult {
            answer: "Paris".to_string(),
            sources: vec![SourceRef::new("Atlas", "12", "capital")],
            latency_ms: Some(3),
        }));

        assert_eq!(reply.status, ReplyStatus::Answered);
        assert_eq!(reply.latency_ms, Some(3));
        let value = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(value["status"], "answered");
        assert_eq!(value["sources"][0]["locator"], "12");
    }

    #[test]
    fn not_implemented_outcome_has_no_latency() {
        let reply =
            AskReply::from(RagOutcome::NotImplemented { stage: PipelineStage::Generate });

        assert_eq!(reply.status, ReplyStatus::NotImplemented);
        assert_eq!(reply.answer, NOT_IMPLEMENTED_ANSWER);
        assert!(reply.sources.is_empty());
        assert_eq!(reply.latency_ms, None);
    }
}
