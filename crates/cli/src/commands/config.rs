use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use relay_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigSource {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl ConfigSource {
    fn detect() -> Self {
        let path = detect_config_path();
        let doc = load_config_file_doc(path.as_deref());
        Self { doc, path }
    }

    fn field(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let source = ConfigSource::detect();
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(key, value, source.field(key, env_keys)));
    };

    push("gateway.bind_address", &config.gateway.bind_address, &["RELAY_GATEWAY_BIND_ADDRESS"]);
    push("gateway.port", &config.gateway.port.to_string(), &["RELAY_GATEWAY_PORT"]);
    push(
        "gateway.force_tool",
        config.gateway.force_tool.map_or("<unset>", |tool| tool.as_str()),
        &["RELAY_FORCE_TOOL"],
    );

    push("rag.transport", config.rag.transport.as_str(), &["RELAY_RAG_TRANSPORT"]);
    push("rag.base_url", config.rag.base_url.as_deref().unwrap_or("<unset>"), &["RELAY_RAG_BASE_URL"]);
    push("rag.timeout_secs", &config.rag.timeout_secs.to_string(), &["RELAY_HTTP_TIMEOUT_SECS"]);
    push("rag.top_k", &config.rag.top_k.to_string(), &["RELAY_RAG_TOP_K"]);
    push("rag.document_capacity", &config.rag.document_capacity.to_string(), &[]);
    push(
        "rag.document_ttl_secs",
        &config.rag.document_ttl_secs.map_or_else(|| "<unset>".to_string(), |ttl| ttl.to_string()),
        &[],
    );
    push(
        "rag.documents_dir",
        &config
            .rag
            .documents_dir
            .as_ref()
            .map_or_else(|| "<unset>".to_string(), |dir| dir.display().to_string()),
        &["RELAY_RAG_DOCUMENTS_DIR"],
    );

    push(
        "security.allowed_origins",
        &config.security.allowed_origins.join(","),
        &["RELAY_ALLOWED_MCP_ORIGINS"],
    );
    let token = config
        .security
        .internal_token
        .as_ref()
        .map_or_else(|| "<unset>".to_string(), |token| redact_token(token.expose_secret()));
    push("security.internal_token", &token, &["RELAY_INTERNAL_MCP_TOKEN"]);
    push("security.gateway_origin", &config.security.gateway_origin, &["RELAY_GATEWAY_ORIGIN"]);

    push("llm.base_url", config.llm.base_url.as_deref().unwrap_or("<unset>"), &["RELAY_LLM_BASE_URL"]);
    push("llm.model", config.llm.model.as_deref().unwrap_or("<unset>"), &["RELAY_LLM_MODEL"]);
    push("llm.timeout_secs", &config.llm.timeout_secs.to_string(), &["RELAY_LLM_TIMEOUT_SECS"]);

    push(
        "routing.media_phrases",
        &config.routing.media_phrases.len().to_string(),
        &["RELAY_ROUTING_MEDIA_PHRASES"],
    );
    push(
        "routing.cards_phrases",
        &config.routing.cards_phrases.len().to_string(),
        &["RELAY_ROUTING_CARDS_PHRASES"],
    );
    push(
        "routing.ingest_phrases",
        &config.routing.ingest_phrases.len().to_string(),
        &["RELAY_ROUTING_INGEST_PHRASES"],
    );

    push(
        "rag_service.bind_address",
        &config.rag_service.bind_address,
        &["RELAY_RAG_SERVICE_BIND_ADDRESS"],
    );
    push("rag_service.port", &config.rag_service.port.to_string(), &["RELAY_RAG_SERVICE_PORT"]);

    push("logging.level", &config.logging.level, &["RELAY_LOGGING_LEVEL", "RELAY_LOG_LEVEL"]);
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["RELAY_LOGGING_FORMAT", "RELAY_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("relay.toml"), PathBuf::from("config/relay.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

// Phrase lists render as counts; the token keeps at most a four-character prefix.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.len() < 12 {
        return "<redacted>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::redact_token;

    #[test]
    fn short_tokens_are_fully_redacted() {
        assert_eq!(redact_token("abc"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn long_tokens_keep_a_short_prefix() {
        assert_eq!(redact_token("AbCdEfGhIjKlMnOp"), "AbCd***");
    }
}
