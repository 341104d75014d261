use async_trait::async_trait;
use relay_core::config::RagTransportKind;
use relay_rag::{RagError, RagOutcome, RagPipeline};
use tracing::debug;

use super::{RagReply, RagTransport, TransportFailure};

/// Runs the pipeline inside the gateway process.
#[derive(Clone)]
pub struct InProcessTransport {
    pipeline: RagPipeline,
}

impl InProcessTransport {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl RagTransport for InProcessTransport {
    fn kind(&self) -> RagTransportKind {
        RagTransportKind::InProcess
    }

    async fn ask(&self, question: &str) -> Result<RagReply, TransportFailure> {
        match self.pipeline.run(question).await {
            Ok(RagOutcome::Answered(result)) => Ok(RagReply::Answered(result)),
            Ok(RagOutcome::NotImplemented { stage }) | Err(RagError::NotImplemented { stage }) => {
                debug!(stage = %stage, "rag pipeline stage is a stub");
                Ok(RagReply::NotImplemented)
            }
            Err(RagError::Validation(message)) => Err(TransportFailure::Rejected(message)),
            Err(error @ RagError::Backend { .. }) => {
                Err(TransportFailure::Transport(error.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use relay_rag::{
        Document, Generator, KeywordRetriever, RagError, RagPipeline, UnconfiguredGenerator,
    };

    use super::InProcessTransport;
    use crate::transport::{RagReply, RagTransport, TransportFailure};

    fn transport() -> InProcessTransport {
        InProcessTransport::new(RagPipeline::new(
            Arc::new(KeywordRetriever::new(4, 8, None)),
            Arc::new(UnconfiguredGenerator),
        ))
    }

    #[tokio::test]
    async fn stub_generator_reports_not_implemented() {
        let reply = transport().ask("What is RAG?").await.expect("stub is not a failure");
        assert_eq!(reply, RagReply::NotImplemented);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let failure = transport().ask("   ").await.expect_err("blank question");
        assert!(matches!(failure, TransportFailure::Rejected(_)));
    }

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, _query: &str, context: &str) -> Result<String, RagError> {
            Ok(format!("from context: {context}"))
        }
    }

    #[tokio::test]
    async fn answered_run_carries_sources_and_latency() {
        let retriever = Arc::new(KeywordRetriever::new(4, 8, None));
        retriever.add_document(Document::new("Atlas", "p. 1", "Paris is in France")).await;
        let transport =
            InProcessTransport::new(RagPipeline::new(retriever, Arc::new(EchoGenerator)));

        let RagReply::Answered(result) = transport.ask("where is paris").await.expect("ok") else {
            panic!("expected an answer");
        };
        assert_eq!(result.answer, "from context: Paris is in France");
        assert_eq!(result.sources[0].title, "Atlas");
        assert!(result.latency_ms.is_some());
    }
}
