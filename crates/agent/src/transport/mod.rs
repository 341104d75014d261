//! Uniform invocation of the RAG backend.
//!
//! Every adapter, whether it runs the pipeline in-process or calls a remote
//! service, reduces its reply to the same [`RagReply`] and its failures to the
//! same [`TransportFailure`] kinds so the dispatcher never branches on how the
//! backend was reached.

mod http;
mod in_process;
mod mcp;

pub use http::HttpTransport;
pub use in_process::InProcessTransport;
pub use mcp::McpTransport;

use async_trait::async_trait;
use relay_core::config::RagTransportKind;
use relay_core::{GatewayError, RagResult, SourceRef};
use relay_rag::schema::ReplyStatus;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RagReply {
    Answered(RagResult),
    NotImplemented,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportFailure {
    /// Unreachable, timed out, or answered with a server-side status.
    #[error("RAG service unavailable: {0}")]
    Transport(String),
    #[error("RAG service returned an invalid reply: {0}")]
    Protocol(String),
    #[error("RAG service rejected the request: {0}")]
    Rejected(String),
    #[error("RAG service refused the gateway credentials: {0}")]
    Unauthorized(String),
}

impl TransportFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<TransportFailure> for GatewayError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Transport(detail) => {
                GatewayError::transport(format!("RAG service failed: {detail}"))
            }
            TransportFailure::Protocol(detail) => {
                GatewayError::protocol(format!("RAG service reply was malformed: {detail}"))
            }
            TransportFailure::Rejected(detail) => GatewayError::Validation(detail),
            TransportFailure::Unauthorized(detail) => {
                GatewayError::Config(format!("RAG service credentials rejected: {detail}"))
            }
        }
    }
}

#[async_trait]
pub trait RagTransport: Send + Sync {
    fn kind(&self) -> RagTransportKind;

    async fn ask(&self, question: &str) -> Result<RagReply, TransportFailure>;
}

#[derive(Debug, Deserialize)]
struct WireReply {
    answer: String,
    #[serde(default)]
    sources: Option<Vec<SourceRef>>,
    #[serde(default)]
    latency_ms: Option<u64>,
    #[serde(default)]
    status: ReplyStatus,
}

/// Reduces a backend's JSON reply to a [`RagReply`].
///
/// Missing `sources` become an empty list and a missing `latency_ms` stays
/// absent rather than becoming zero. A missing `answer`, a negative latency or
/// any other schema mismatch is a protocol failure.
pub fn normalize_reply(value: Value) -> Result<RagReply, TransportFailure> {
    let reply = serde_json::from_value::<WireReply>(value)
        .map_err(|error| TransportFailure::Protocol(error.to_string()))?;

    Ok(match reply.status {
        ReplyStatus::NotImplemented => RagReply::NotImplemented,
        ReplyStatus::Answered => RagReply::Answered(RagResult {
            answer: reply.answer,
            sources: reply.sources.unwrap_or_default(),
            latency_ms: reply.latency_ms,
        }),
    })
}

#[cfg(test)]
mod tests {
    use relay_core::{GatewayError, RagResult, SourceRef};
    use serde_json::json;

    use super::{normalize_reply, RagReply, TransportFailure};

    #[test]
    fn missing_optional_fields_default_without_inventing_latency() {
        let reply = normalize_reply(json!({ "answer": "Paris" })).expect("valid reply");

        assert_eq!(
            reply,
            RagReply::Answered(RagResult {
                answer: "Paris".to_string(),
                sources: Vec::new(),
                latency_ms: None,
            })
        );
    }

    #[test]
    fn tolerant_sources_are_normalized() {
        let reply = normalize_reply(json!({
            "answer": "Paris",
            "sources": [{ "title": "Atlas", "page": 12, "snippet": "capital" }],
            "latency_ms": 41,
        }))
        .expect("valid reply");

        let RagReply::Answered(result) = reply else {
            panic!("expected an answer");
        };
        assert_eq!(result.sources, vec![SourceRef::new("Atlas", "12", "capital")]);
        assert_eq!(result.latency_ms, Some(41));
    }

    #[test]
    fn null_sources_are_treated_as_empty() {
        let reply =
            normalize_reply(json!({ "answer": "a", "sources": null })).expect("valid reply");
        assert!(matches!(reply, RagReply::Answered(result) if result.sources.is_empty()));
    }

    #[test]
    fn not_implemented_status_is_not_an_answer() {
        let reply = normalize_reply(json!({
            "answer": "RAG pipeline is not implemented yet.",
            "sources": [],
            "latency_ms": null,
            "status": "not_implemented",
        }))
        .expect("valid reply");

        assert_eq!(reply, RagReply::NotImplemented);
    }

    #[test]
    fn schema_mismatches_are_protocol_failures() {
        for body in [
            json!({ "sources": [] }),
            json!({ "answer": "a", "latency_ms": -5 }),
            json!({ "answer": "a", "status": "exploded" }),
            json!(["not", "an", "object"]),
        ] {
            let failure = normalize_reply(body.clone()).expect_err("must be rejected");
            assert!(matches!(failure, TransportFailure::Protocol(_)), "{body}");
            assert!(!failure.is_retryable());
        }
    }

    #[test]
    fn failure_kinds_map_onto_gateway_errors() {
        let transport = GatewayError::from(TransportFailure::Transport("refused".into()));
        assert_eq!(transport.error_class(), "transport");
        assert!(transport.is_retryable());
        assert!(transport.to_string().contains("RAG service failed: refused"));

        let protocol = GatewayError::from(TransportFailure::Protocol("no answer".into()));
        assert_eq!(protocol.error_class(), "protocol");

        let rejected = GatewayError::from(TransportFailure::Rejected("empty".into()));
        assert_eq!(rejected, GatewayError::Validation("empty".to_string()));

        let unauthorized = GatewayError::from(TransportFailure::Unauthorized("401".into()));
        assert_eq!(unauthorized.error_class(), "config");
    }
}
