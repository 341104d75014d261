//! Gateway transports against a live RAG service
//!
//! Serves the service router on an ephemeral port and drives it with the
//! gateway's HTTP and tool-protocol clients, checking that both transports
//! classify answers and rejections alike.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_agent::transport::{HttpTransport, McpTransport};
use relay_agent::{RagReply, RagTransport, TransportFailure};
use relay_mcp::{router, McpGuard, ServiceState};
use relay_rag::{Document, Generator, KeywordRetriever, RagError, RagPipeline};
use secrecy::SecretString;

const GATEWAY_ORIGIN: &str = "http://gateway-api.internal";
const TOKEN: &str = "round-trip-token";
const TIMEOUT: Duration = Duration::from_secs(10);

struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, query: &str, _context: &str) -> Result<String, RagError> {
        Ok(format!("echo: {query}"))
    }
}

async fn spawn_service() -> String {
    let retriever = KeywordRetriever::with_documents(
        4,
        16,
        None,
        vec![Document::new("Atlas", "atlas.txt#1", "Paris is the capital of France.")],
    );
    let pipeline = RagPipeline::new(Arc::new(retriever), Arc::new(EchoGenerator));
    let guard =
        McpGuard::new(vec![GATEWAY_ORIGIN.to_string()], Some(SecretString::from(TOKEN.to_string())));
    let app = router(ServiceState::new(pipeline, guard));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{address}")
}

fn mcp_transport(base_url: &str, token: &str, origin: &str) -> McpTransport {
    McpTransport::new(base_url, TIMEOUT, SecretString::from(token.to_string()), origin)
        .expect("transport")
}

fn assert_answered(reply: RagReply) {
    let RagReply::Answered(result) = reply else {
        panic!("expected an answered reply");
    };
    assert_eq!(result.answer, "echo: capital of France");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].title, "Atlas");
    assert_eq!(result.sources[0].locator, "atlas.txt#1");
    assert!(result.latency_ms.is_some());
}

#[tokio::test]
async fn http_transport_round_trip_answers_with_sources() {
    let base_url = spawn_service().await;
    let transport = HttpTransport::new(&base_url, TIMEOUT, None).expect("transport");

    assert_answered(transport.ask("capital of France").await.expect("answered"));
}

#[tokio::test]
async fn http_transport_maps_blank_question_to_rejection() {
    let base_url = spawn_service().await;
    let transport = HttpTransport::new(&base_url, TIMEOUT, None).expect("transport");

    let failure = transport.ask("   ").await.expect_err("blank question");
    assert!(matches!(failure, TransportFailure::Rejected(_)), "got {failure:?}");
}

#[tokio::test]
async fn mcp_transport_round_trip_answers_with_sources() {
    let base_url = spawn_service().await;
    let transport = mcp_transport(&base_url, TOKEN, GATEWAY_ORIGIN);

    assert_answered(transport.ask("capital of France").await.expect("answered"));
}

#[tokio::test]
async fn mcp_transport_maps_blank_question_to_rejection() {
    let base_url = spawn_service().await;
    let transport = mcp_transport(&base_url, TOKEN, GATEWAY_ORIGIN);

    let failure = transport.ask("   ").await.expect_err("blank question");
    assert!(matches!(failure, TransportFailure::Rejected(_)), "got {failure:?}");
}

#[tokio::test]
async fn mcp_transport_classifies_bad_origin_as_unauthorized() {
    let base_url = spawn_service().await;
    let transport = mcp_transport(&base_url, TOKEN, "http://evil.example");

    let failure = transport.ask("capital of France").await.expect_err("origin refused");
    assert!(matches!(failure, TransportFailure::Unauthorized(_)), "got {failure:?}");
    assert!(!failure.is_retryable());
}

#[tokio::test]
async fn mcp_transport_classifies_bad_token_as_unauthorized() {
    let base_url = spawn_service().await;
    let transport = mcp_transport(&base_url, "wrong-token", GATEWAY_ORIGIN);

    let failure = transport.ask("capital of France").await.expect_err("token refused");
    assert!(matches!(failure, TransportFailure::Unauthorized(_)), "got {failure:?}");
}

#[tokio::test]
async fn mcp_credential_rejection_surfaces_as_config_error() {
    let base_url = spawn_service().await;
    let mcp = mcp_transport(&base_url, "wrong-token", GATEWAY_ORIGIN)
        .ask("capital of France")
        .await
        .expect_err("token refused");
    let error = relay_core::GatewayError::from(mcp);

    assert_eq!(error.error_class(), "config");
    assert!(!error.is_retryable());
}
