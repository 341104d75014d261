use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{AskRequest, GatewayError, RagResult, ToolDecision};

use crate::transport::{RagReply, RagTransport};

pub const NO_TOOL_MESSAGE: &str = "No tool selected. Please ask a question or provide more context.";

/// What a backend produced for one request, before the dispatcher attaches a
/// trace id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    Answered(RagResult),
    /// The RAG backend is reachable but one of its stages is a stub.
    NotImplemented,
    /// Soft success from a backend with no real integration yet.
    Placeholder(String),
}

#[async_trait]
pub trait ToolBackend: Send + Sync {
    fn tool(&self) -> ToolDecision;

    async fn handle(&self, request: &AskRequest) -> Result<ToolOutcome, GatewayError>;
}

/// Forwards the message to the RAG backend as the question.
pub struct RagTool {
    transport: Arc<dyn RagTransport>,
}

impl RagTool {
    pub fn new(transport: Arc<dyn RagTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ToolBackend for RagTool {
    fn tool(&self) -> ToolDecision {
        ToolDecision::Rag
    }

    async fn handle(&self, request: &AskRequest) -> Result<ToolOutcome, GatewayError> {
        match self.transport.ask(&request.message).await? {
            RagReply::Answered(result) => Ok(ToolOutcome::Answered(result)),
            RagReply::NotImplemented => Ok(ToolOutcome::NotImplemented),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaceholderTool {
    tool: ToolDecision,
}

impl PlaceholderTool {
    pub fn new(tool: ToolDecision) -> Self {
        Self { tool }
    }

    pub fn message(&self) -> String {
        let label = match self.tool {
            ToolDecision::Media => "Media",
            ToolDecision::Cards => "Cards",
            ToolDecision::Ingest => "Ingest",
            ToolDecision::Rag => "RAG",
            ToolDecision::NoTool => return NO_TOOL_MESSAGE.to_string(),
        };
        format!(
            "{label} tool selected, but {} integration is not implemented in the gateway yet.",
            self.tool
        )
    }
}

#[async_trait]
impl ToolBackend for PlaceholderTool {
    fn tool(&self) -> ToolDecision {
        self.tool
    }

    async fn handle(&self, _request: &AskRequest) -> Result<ToolOutcome, GatewayError> {
        Ok(ToolOutcome::Placeholder(self.message()))
    }
}

/// Exactly one backend per [`ToolDecision`].
///
/// Backends are plain fields rather than a map so a new decision variant
/// fails to compile until it has a backend.
#[derive(Clone)]
pub struct ToolRegistry {
    rag: Arc<dyn ToolBackend>,
    media: Arc<dyn ToolBackend>,
    cards: Arc<dyn ToolBackend>,
    ingest: Arc<dyn ToolBackend>,
    none: Arc<dyn ToolBackend>,
}

impl ToolRegistry {
    /// RAG over `transport`; every other tool is a placeholder.
    pub fn new(transport: Arc<dyn RagTransport>) -> Self {
        Self {
            rag: Arc::new(RagTool::new(transport)),
            media: Arc::new(PlaceholderTool::new(ToolDecision::Media)),
            cards: Arc::new(PlaceholderTool::new(ToolDecision::Cards)),
            ingest: Arc::new(PlaceholderTool::new(ToolDecision::Ingest)),
            none: Arc::new(PlaceholderTool::new(ToolDecision::NoTool)),
        }
    }

    /// Replaces the backend registered for `backend.tool()`.
    pub fn with_backend(mut self, backend: Arc<dyn ToolBackend>) -> Self {
        match backend.tool() {
            ToolDecision::Rag => self.rag = backend,
            ToolDecision::Media => self.media = backend,
            ToolDecision::Cards => self.cards = backend,
            ToolDecision::Ingest => self.ingest = backend,
            ToolDecision::NoTool => self.none = backend,
        }
        self
    }

    pub fn backend(&self, decision: ToolDecision) -> &Arc<dyn ToolBackend> {
        match decision {
            ToolDecision::Rag => &self.rag,
            ToolDecision::Media => &self.media,
            ToolDecision::Cards => &self.cards,
            ToolDecision::Ingest => &self.ingest,
            ToolDecision::NoTool => &self.none,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use relay_core::config::RagTransportKind;
    use relay_core::{AskRequest, GatewayError, ToolDecision};

    use super::{PlaceholderTool, ToolBackend, ToolOutcome, ToolRegistry, NO_TOOL_MESSAGE};
    use crate::transport::{RagReply, RagTransport, TransportFailure};

    struct StubTransport(Result<RagReply, TransportFailure>);

    #[async_trait]
    impl RagTransport for StubTransport {
        fn kind(&self) -> RagTransportKind {
            RagTransportKind::InProcess
        }

        async fn ask(&self, _question: &str) -> Result<RagReply, TransportFailure> {
            self.0.clone()
        }
    }

    #[test]
    fn placeholder_messages_name_the_tool() {
        assert_eq!(
            PlaceholderTool::new(ToolDecision::Media).message(),
            "Media tool selected, but media integration is not implemented in the gateway yet."
        );
        assert_eq!(
            PlaceholderTool::new(ToolDecision::Cards).message(),
            "Cards tool selected, but cards integration is not implemented in the gateway yet."
        );
        assert_eq!(
            PlaceholderTool::new(ToolDecision::Ingest).message(),
            "Ingest tool selected, but ingest integration is not implemented in the gateway yet."
        );
        assert_eq!(PlaceholderTool::new(ToolDecision::NoTool).message(), NO_TOOL_MESSAGE);
    }

    #[test]
    fn registry_holds_one_backend_per_decision() {
        let registry = ToolRegistry::new(Arc::new(StubTransport(Ok(RagReply::NotImplemented))));
        for decision in ToolDecision::ALL {
            assert_eq!(registry.backend(decision).tool(), decision);
        }
    }

    #[test]
    fn with_backend_replaces_only_its_slot() {
        struct RealMedia;

        #[async_trait]
        impl ToolBackend for RealMedia {
            fn tool(&self) -> ToolDecision {
                ToolDecision::Media
            }

            async fn handle(&self, _request: &AskRequest) -> Result<ToolOutcome, GatewayError> {
                Ok(ToolOutcome::Placeholder("described".to_string()))
            }
        }

        let registry = ToolRegistry::new(Arc::new(StubTransport(Ok(RagReply::NotImplemented))))
            .with_backend(Arc::new(RealMedia));

        assert_eq!(registry.backend(ToolDecision::Media).tool(), ToolDecision::Media);
        assert_eq!(registry.backend(ToolDecision::Cards).tool(), ToolDecision::Cards);
    }

    #[tokio::test]
    async fn rag_tool_translates_transport_failures() {
        let registry = ToolRegistry::new(Arc::new(StubTransport(Err(
            TransportFailure::Transport("connection refused".to_string()),
        ))));

        let error = registry
            .backend(ToolDecision::Rag)
            .handle(&AskRequest::new("What is RAG?"))
            .await
            .expect_err("transport failure");
        assert_eq!(error.error_class(), "transport");
    }

    #[tokio::test]
    async fn rag_tool_passes_not_implemented_through() {
        let registry = ToolRegistry::new(Arc::new(StubTransport(Ok(RagReply::NotImplemented))));
        let outcome =
            registry.backend(ToolDecision::Rag).handle(&AskRequest::new("q")).await.expect("ok");
        assert_eq!(outcome, ToolOutcome::NotImplemented);
    }
}
