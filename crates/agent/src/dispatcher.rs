use std::time::Duration;

use relay_core::{
    new_trace_id, AskRequest, GatewayError, InterfaceError, ResponseEnvelope, ToolDecision,
};
use relay_rag::schema::NOT_IMPLEMENTED_ANSWER;
use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::classifier::{IntentClassifier, RouteRule};
use crate::tools::{ToolOutcome, ToolRegistry};

/// A dispatch failure together with the trace id of the request that hit it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{error} (trace_id={trace_id})")]
pub struct TracedError {
    pub trace_id: String,
    pub error: GatewayError,
}

impl TracedError {
    pub fn into_interface(self) -> InterfaceError {
        self.error.into_interface(self.trace_id)
    }
}

/// Routes one request to one tool backend and shapes the reply.
///
/// The decision is made exactly once per request. A configured forced tool
/// skips the classifier entirely.
#[derive(Clone)]
pub struct GatewayDispatcher {
    classifier: IntentClassifier,
    registry: ToolRegistry,
    force_tool: Option<ToolDecision>,
    request_timeout: Duration,
}

impl GatewayDispatcher {
    pub fn new(
        classifier: IntentClassifier,
        registry: ToolRegistry,
        request_timeout: Duration,
    ) -> Self {
        Self { classifier, registry, force_tool: None, request_timeout }
    }

    pub fn with_force_tool(mut self, force_tool: Option<ToolDecision>) -> Self {
        self.force_tool = force_tool;
        self
    }

    pub fn force_tool(&self) -> Option<ToolDecision> {
        self.force_tool
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// The tool a request would be routed to, with the classifier rule that
    /// matched. The rule is `None` when the tool was forced.
    pub fn decide(&self, request: &AskRequest) -> (ToolDecision, Option<RouteRule>) {
        match self.force_tool {
            Some(tool) => (tool, None),
            None => {
                let (tool, rule) = self.classifier.classify(&request.message, request.has_media);
                (tool, Some(rule))
            }
        }
    }

    pub async fn ask(&self, request: &AskRequest) -> Result<ResponseEnvelope, TracedError> {
        let trace_id = new_trace_id();
        let started = Instant::now();
        let (tool, rule) = self.decide(request);

        info!(
            event_name = "gateway.dispatch.decided",
            trace_id = %trace_id,
            tool = tool.as_str(),
            rule = rule.map_or("forced", |rule| rule.as_str()),
            has_media = request.has_media,
            "tool selected"
        );

        let backend = self.registry.backend(tool);
        let outcome = match timeout(self.request_timeout, backend.handle(request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::transport(format!(
                "{tool} backend timed out after {}ms",
                self.request_timeout.as_millis()
            ))),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "gateway.dispatch.failed",
                    trace_id = %trace_id,
                    tool = tool.as_str(),
                    error_class = error.error_class(),
                    retryable = error.is_retryable(),
                    error = %error,
                    "tool dispatch failed"
                );
                return Err(TracedError { trace_id, error });
            }
        };

        // The envelope reports the committed decision whatever the backend returned.
        let envelope = match outcome {
            ToolOutcome::Answered(result) if tool.carries_attribution() => {
                ResponseEnvelope::rag(result, trace_id)
            }
            ToolOutcome::Answered(result) => {
                ResponseEnvelope::unattributed(tool, result.answer, trace_id)
            }
            ToolOutcome::NotImplemented => {
                ResponseEnvelope::unattributed(tool, NOT_IMPLEMENTED_ANSWER, trace_id)
            }
            ToolOutcome::Placeholder(message) => {
                ResponseEnvelope::unattributed(tool, message, trace_id)
            }
        };

        info!(
            event_name = "gateway.dispatch.completed",
            trace_id = %envelope.trace_id,
            tool = envelope.tool_used.as_str(),
            sources = envelope.sources.len(),
            latency_ms = ?envelope.latency_ms,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "tool dispatch completed"
        );

        Ok(envelope)
    }
}
