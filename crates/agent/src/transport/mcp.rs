use std::time::Duration;

use async_trait::async_trait;
use relay_core::config::RagTransportKind;
use relay_core::GatewayError;
use relay_rag::schema::ASK_TOOL;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN};
use rmcp::model::{CallToolRequestParam, CallToolResult, ErrorCode};
use rmcp::service::{ClientInitializeError, ServiceError};
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransportConfig, StreamableHttpError,
};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use super::{normalize_reply, RagReply, RagTransport, TransportFailure};

/// Calls the `ask` tool over the streamable-HTTP tool protocol.
///
/// A session is opened per call and cancelled once the tool returns, so an
/// idle gateway holds no connection to the service.
#[derive(Clone)]
pub struct McpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: SecretString,
}

impl McpTransport {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        token: SecretString,
        origin: &str,
    ) -> Result<Self, GatewayError> {
        let origin = HeaderValue::from_str(origin).map_err(|error| {
            GatewayError::Config(format!("security.gateway_origin is not a valid header: {error}"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, origin);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| GatewayError::Config(format!("http client setup failed: {error}")))?;

        Ok(Self { client, endpoint: format!("{}/mcp", base_url.trim_end_matches('/')), token })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RagTransport for McpTransport {
    fn kind(&self) -> RagTransportKind {
        RagTransportKind::Mcp
    }

    async fn ask(&self, question: &str) -> Result<RagReply, TransportFailure> {
        let config = StreamableHttpClientTransportConfig::with_uri(self.endpoint.clone())
            .auth_header(self.token.expose_secret().to_string());
        let transport = StreamableHttpClientTransport::with_client(self.client.clone(), config);

        let service = ().serve(transport).await.map_err(session_failure)?;
        debug!(endpoint = %self.endpoint, "tool session opened");

        let arguments = match json!({ "question": question }) {
            Value::Object(map) => Some(map),
            _ => None,
        };
        let called =
            service.call_tool(CallToolRequestParam { name: ASK_TOOL.into(), arguments }).await;

        if let Err(error) = service.cancel().await {
            debug!(error = %error, "tool session did not close cleanly");
        }

        match called {
            Ok(result) => reply_from_tool_result(result),
            Err(ServiceError::McpError(error)) if error.code == ErrorCode::INVALID_PARAMS => {
                Err(TransportFailure::Rejected(error.message.to_string()))
            }
            Err(error) => Err(TransportFailure::Transport(format!("tool call failed: {error}"))),
        }
    }
}

/// Credential rejections keep the same classification as [`super::HttpTransport`].
fn session_failure(error: ClientInitializeError) -> TransportFailure {
    let detail = format!("tool session could not be opened: {error}");
    match rejected_status(&error) {
        Some(status) if matches!(status.as_u16(), 401 | 403) => TransportFailure::Unauthorized(
            format!("RAG service refused credentials ({status})"),
        ),
        _ => TransportFailure::Transport(detail),
    }
}

fn rejected_status(error: &ClientInitializeError) -> Option<reqwest::StatusCode> {
    let ClientInitializeError::TransportError { error, .. } = error else {
        return None;
    };
    match error.error.downcast_ref::<StreamableHttpError<reqwest::Error>>()? {
        StreamableHttpError::Client(inner) => inner.status(),
        StreamableHttpError::AuthRequired(_) => Some(reqwest::StatusCode::UNAUTHORIZED),
        _ => None,
    }
}

fn reply_from_tool_result(result: CallToolResult) -> Result<RagReply, TransportFailure> {
    let text = result
        .content
        .iter()
        .find_map(|content| content.as_text().map(|text| text.text.clone()));

    if result.is_error.unwrap_or(false) {
        let detail = text.unwrap_or_else(|| "tool reported an error".to_string());
        return Err(TransportFailure::Transport(detail));
    }

    if let Some(structured) = result.structured_content {
        return normalize_reply(structured);
    }

    let text = text.ok_or_else(|| {
        TransportFailure::Protocol("tool result carried no text content".to_string())
    })?;
    let value = serde_json::from_str::<Value>(&text)
        .map_err(|error| TransportFailure::Protocol(format!("tool text is not JSON: {error}")))?;
    normalize_reply(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rmcp::model::{CallToolResult, Content};
    use secrecy::SecretString;
    use serde_json::json;

    use super::{reply_from_tool_result, McpTransport};
    use crate::transport::{RagReply, TransportFailure};

    #[test]
    fn endpoint_targets_mcp_path() {
        let transport = McpTransport::new(
            "http://rag:8001/",
            Duration::from_secs(2),
            SecretString::from("token".to_string()),
            "http://gateway-api.internal",
        )
        .expect("transport");
        assert_eq!(transport.endpoint(), "http://rag:8001/mcp");
    }

    #[test]
    fn invalid_origin_header_is_a_config_error() {
        let error = McpTransport::new(
            "http://rag:8001",
            Duration::from_secs(2),
            SecretString::from("token".to_string()),
            "bad\norigin",
        )
        .err()
        .expect("newline is not a header value");
        assert_eq!(error.error_class(), "config");
    }

    #[test]
    fn text_content_is_normalized() {
        let body = json!({ "answer": "Paris", "sources": [], "latency_ms": 9 }).to_string();
        let reply =
            reply_from_tool_result(CallToolResult::success(vec![Content::text(body)])).expect("ok");

        assert!(matches!(reply, RagReply::Answered(result) if result.latency_ms == Some(9)));
    }

    #[test]
    fn error_results_are_transport_failures() {
        let failure = reply_from_tool_result(CallToolResult::error(vec![Content::text(
            "retrieve backend failed: index offline",
        )]))
        .expect_err("error result");

        assert_eq!(
            failure,
            TransportFailure::Transport("retrieve backend failed: index offline".to_string())
        );
    }

    #[test]
    fn non_json_text_is_a_protocol_failure() {
        let failure =
            reply_from_tool_result(CallToolResult::success(vec![Content::text("hello")]))
                .expect_err("not json");
        assert!(matches!(failure, TransportFailure::Protocol(_)));
    }
}
