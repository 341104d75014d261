use std::time::Duration;

use async_trait::async_trait;
use relay_core::config::RagTransportKind;
use relay_core::GatewayError;
use relay_rag::schema::AskPayload;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::{normalize_reply, RagReply, RagTransport, TransportFailure};

const MAX_DETAIL_CHARS: usize = 200;

/// Calls the RAG service's plain `POST /ask` endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        token: Option<SecretString>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Config(format!("http client setup failed: {error}")))?;

        Ok(Self { client, endpoint: format!("{}/ask", base_url.trim_end_matches('/')), token })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RagTransport for HttpTransport {
    fn kind(&self) -> RagTransportKind {
        RagTransportKind::Http
    }

    async fn ask(&self, question: &str) -> Result<RagReply, TransportFailure> {
        let mut request =
            self.client.post(&self.endpoint).json(&AskPayload { question: question.to_string() });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(describe_send_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(|error| {
            TransportFailure::Transport(format!("reading response body failed: {error}"))
        })?;

        check_status(status, &body)?;

        let value = serde_json::from_slice::<Value>(&body)
            .map_err(|error| TransportFailure::Protocol(format!("body is not JSON: {error}")))?;
        normalize_reply(value)
    }
}

fn describe_send_error(error: reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Transport("request timed out".to_string())
    } else if error.is_connect() {
        TransportFailure::Transport(format!("connection failed: {error}"))
    } else {
        TransportFailure::Transport(error.to_string())
    }
}

pub(crate) fn check_status(status: StatusCode, body: &[u8]) -> Result<(), TransportFailure> {
    if status.is_success() {
        return Ok(());
    }

    let detail = error_detail(body).unwrap_or_else(|| status.to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportFailure::Unauthorized(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            TransportFailure::Rejected(detail)
        }
        _ => TransportFailure::Transport(format!("returned {status}: {detail}")),
    })
}

// Prefer the `detail` field the service puts in error bodies.
fn error_detail(body: &[u8]) -> Option<String> {
    let detail = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => return None,
        },
        _ => String::from_utf8_lossy(body).trim().to_string(),
    };
    (!detail.is_empty()).then(|| detail.chars().take(MAX_DETAIL_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{check_status, HttpTransport};
    use crate::transport::{RagTransport, TransportFailure};

    #[test]
    fn endpoint_strips_trailing_slash() {
        let transport =
            HttpTransport::new("http://rag:8001/", Duration::from_secs(2), None).expect("client");
        assert_eq!(transport.endpoint(), "http://rag:8001/ask");
    }

    #[test]
    fn success_statuses_pass() {
        assert_eq!(check_status(StatusCode::OK, b"{}"), Ok(()));
    }

    #[test]
    fn auth_statuses_are_unauthorized() {
        let failure = check_status(StatusCode::UNAUTHORIZED, br#"{"detail":"Unauthorized"}"#)
            .expect_err("401");
        assert_eq!(failure, TransportFailure::Unauthorized("Unauthorized".to_string()));

        let failure = check_status(StatusCode::FORBIDDEN, br#"{"detail":"Invalid Origin"}"#)
            .expect_err("403");
        assert!(matches!(failure, TransportFailure::Unauthorized(_)));
    }

    #[test]
    fn client_errors_are_rejections() {
        let failure = check_status(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail":[1]}"#)
            .expect_err("422");
        assert_eq!(failure, TransportFailure::Rejected("[1]".to_string()));
    }

    #[test]
    fn server_errors_are_retryable_transport_failures() {
        let failure =
            check_status(StatusCode::BAD_GATEWAY, b"upstream down").expect_err("502");
        assert!(failure.is_retryable());
        assert!(failure.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_failure() {
        let transport =
            HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2), None).expect("client");

        let failure = transport.ask("What is RAG?").await.expect_err("nothing listens there");
        assert!(failure.is_retryable(), "{failure:?}");
    }
}
