//! Tool-protocol server exposing the RAG pipeline as the `ask` tool.

use relay_rag::schema::{AskReply, ASK_TOOL};
use relay_rag::RagPipeline;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars::{self, JsonSchema};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::McpError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AskToolInput {
    #[schemars(description = "Natural-language question to answer from the indexed documents")]
    pub question: String,
}

#[derive(Clone)]
pub struct RagMcpServer {
    pipeline: RagPipeline,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl RagMcpServer {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self { pipeline, tool_router: Self::tool_router() }
    }

    #[tool(
        name = "ask",
        description = "Answer a question with retrieval-augmented generation. Returns JSON \
                       with answer, sources, latency_ms and status."
    )]
    async fn ask(
        &self,
        Parameters(input): Parameters<AskToolInput>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.pipeline.run(&input.question).await {
            Ok(outcome) => {
                let reply = AskReply::from(outcome);
                let body = serde_json::to_string(&reply)
                    .map_err(|error| ErrorData::internal_error(error.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(body)]))
            }
            Err(error) => match McpError::from(error) {
                McpError::Validation(message) => Err(ErrorData::invalid_params(message, None)),
                other => {
                    warn!(
                        event_name = "rag_service.tool.failed",
                        tool = ASK_TOOL,
                        error_code = other.error_code(),
                        error = %other,
                        "ask tool failed"
                    );
                    Ok(CallToolResult::error(vec![Content::text(other.to_string())]))
                }
            },
        }
    }
}

impl RagMcpServer {
    /// Serves a single client over stdin/stdout until it disconnects.
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        use tokio::io::{stdin, stdout};

        info!("starting rag tool server on stdio");
        let service = self.serve((stdin(), stdout())).await?;
        let reason = service.waiting().await?;
        info!(?reason, "rag tool server stopped");
        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for RagMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("RAG question answering tool service".to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use relay_rag::schema::ASK_TOOL;
    use relay_rag::{Document, Generator, KeywordRetriever, PipelineStage, RagError, RagPipeline};
    use rmcp::handler::server::wrapper::Parameters;
    use rmcp::model::ErrorCode;
    use rmcp::ServerHandler;
    use serde_json::Value;

    use super::{AskToolInput, RagMcpServer};

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, query: &str, _context: &str) -> Result<String, RagError> {
            Ok(format!("echo: {query}"))
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl Generator for BrokenGenerator {
        async fn generate(&self, _query: &str, _context: &str) -> Result<String, RagError> {
            Err(RagError::backend(PipelineStage::Generate, "model server unreachable"))
        }
    }

    fn server(generator: Arc<dyn Generator>) -> RagMcpServer {
        let retriever = KeywordRetriever::with_documents(
            4,
            8,
            None,
            vec![Document::new("Atlas", "atlas.txt#1", "Paris is the capital of France.")],
        );
        RagMcpServer::new(RagPipeline::new(Arc::new(retriever), generator))
    }

    fn input(question: &str) -> Parameters<AskToolInput> {
        Parameters(AskToolInput { question: question.to_string() })
    }

    fn text_of(result: &rmcp::model::CallToolResult) -> String {
        result
            .content
            .iter()
            .find_map(|content| content.as_text().map(|text| text.text.clone()))
            .unwrap_or_default()
    }

    #[test]
    fn exposes_only_the_ask_tool_with_tools_capability() {
        let server = server(Arc::new(EchoGenerator));
        let tools = server.tool_router.list_all();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, ASK_TOOL);
        assert!(server.get_info().capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn ask_returns_the_reply_as_json_text() {
        let result = server(Arc::new(EchoGenerator))
            .ask(input("capital of France"))
            .await
            .expect("tool call");

        assert_ne!(result.is_error, Some(true));
        let body: Value = serde_json::from_str(&text_of(&result)).expect("json body");
        assert_eq!(body["answer"], "echo: capital of France");
        assert_eq!(body["sources"][0]["locator"], "atlas.txt#1");
        assert_eq!(body["status"], "answered");
        assert!(body["latency_ms"].is_u64());
    }

    #[tokio::test]
    async fn blank_question_is_an_invalid_params_error() {
        let error = server(Arc::new(EchoGenerator)).ask(input("  ")).await.expect_err("blank");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn backend_failure_is_reported_as_a_tool_error() {
        let result =
            server(Arc::new(BrokenGenerator)).ask(input("capital")).await.expect("tool result");

        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("model server unreachable"));
    }
}
