use std::sync::Arc;
use std::time::Duration;

use relay_core::config::{AppConfig, RagTransportKind};
use relay_core::GatewayError;
use relay_rag::{KeywordRetriever, RagPipeline};
use tracing::info;

use crate::classifier::{IntentClassifier, TriggerPhrases};
use crate::dispatcher::GatewayDispatcher;
use crate::tools::ToolRegistry;
use crate::transport::{HttpTransport, InProcessTransport, McpTransport, RagTransport};

/// A dispatcher wired from configuration. `retriever` is only present when the
/// pipeline runs in-process.
pub struct AgentRuntime {
    pub dispatcher: Arc<GatewayDispatcher>,
    pub retriever: Option<Arc<KeywordRetriever>>,
}

impl AgentRuntime {
    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        let timeout = Duration::from_secs(config.rag.timeout_secs);
        let (transport, retriever) = build_transport(config, timeout)?;

        info!(
            event_name = "gateway.runtime.ready",
            transport = transport.kind().as_str(),
            force_tool = config.gateway.force_tool.map(|tool| tool.as_str()),
            timeout_secs = config.rag.timeout_secs,
            "gateway dispatcher ready"
        );

        let dispatcher = GatewayDispatcher::new(
            IntentClassifier::new(TriggerPhrases::from(&config.routing)),
            ToolRegistry::new(transport),
            timeout,
        )
        .with_force_tool(config.gateway.force_tool);

        Ok(Self { dispatcher: Arc::new(dispatcher), retriever })
    }
}

type BuiltTransport = (Arc<dyn RagTransport>, Option<Arc<KeywordRetriever>>);

fn build_transport(config: &AppConfig, timeout: Duration) -> Result<BuiltTransport, GatewayError> {
    match config.rag.transport {
        RagTransportKind::InProcess => {
            let (pipeline, retriever) = RagPipeline::from_config(config)
                .map_err(|error| GatewayError::Config(error.to_string()))?;
            Ok((Arc::new(InProcessTransport::new(pipeline)), Some(retriever)))
        }
        RagTransportKind::Http => {
            let base_url = remote_base_url(config)?;
            let transport =
                HttpTransport::new(base_url, timeout, config.security.internal_token.clone())?;
            Ok((Arc::new(transport), None))
        }
        RagTransportKind::Mcp => {
            let base_url = remote_base_url(config)?;
            let token = config.security.internal_token.clone().ok_or_else(|| {
                GatewayError::Config("security.internal_token is required for mcp".to_string())
            })?;
            let transport =
                McpTransport::new(base_url, timeout, token, &config.security.gateway_origin)?;
            Ok((Arc::new(transport), None))
        }
    }
}

fn remote_base_url(config: &AppConfig) -> Result<&str, GatewayError> {
    config.rag_endpoint().ok_or_else(|| {
        GatewayError::Config(format!(
            "rag.base_url is required for the {} transport",
            config.rag.transport.as_str()
        ))
    })
}

#[cfg(test)]
mod tests {
    use relay_core::config::{AppConfig, RagTransportKind};
    use relay_core::{AskRequest, ToolDecision};
    use secrecy::SecretString;

    use super::AgentRuntime;

    #[tokio::test]
    async fn default_config_runs_the_pipeline_in_process() {
        let runtime = AgentRuntime::from_config(&AppConfig::default()).expect("runtime");
        assert!(runtime.retriever.is_some());

        let envelope =
            runtime.dispatcher.ask(&AskRequest::new("What is RAG?")).await.expect("envelope");
        assert_eq!(envelope.tool_used, ToolDecision::Rag);
        assert_eq!(envelope.answer, "RAG pipeline is not implemented yet.");
    }

    #[test]
    fn forced_tool_is_carried_into_the_dispatcher() {
        let mut config = AppConfig::default();
        config.gateway.force_tool = Some(ToolDecision::Cards);

        let runtime = AgentRuntime::from_config(&config).expect("runtime");
        assert_eq!(runtime.dispatcher.force_tool(), Some(ToolDecision::Cards));
    }

    #[test]
    fn remote_transport_without_base_url_is_a_config_error() {
        let mut config = AppConfig::default();
        config.rag.transport = RagTransportKind::Http;

        let error = AgentRuntime::from_config(&config).err().expect("missing base url");
        assert_eq!(error.error_class(), "config");
    }

    #[test]
    fn mcp_transport_requires_a_token() {
        let mut config = AppConfig::default();
        config.rag.transport = RagTransportKind::Mcp;
        config.rag.base_url = Some("http://rag:8001".to_string());

        assert!(AgentRuntime::from_config(&config).is_err());

        config.security.internal_token = Some(SecretString::from("s3cret".to_string()));
        let runtime = AgentRuntime::from_config(&config).expect("runtime");
        assert!(runtime.retriever.is_none());
    }
}
