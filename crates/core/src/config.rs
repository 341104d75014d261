use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::domain::tool::ToolDecision;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub rag: RagBackendConfig,
    pub security: SecurityConfig,
    pub llm: LlmConfig,
    pub routing: RoutingConfig,
    pub rag_service: RagServiceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub bind_address: String,
    pub port: u16,
    pub force_tool: Option<ToolDecision>,
}

#[derive(Clone, Debug)]
pub struct RagBackendConfig {
    pub transport: RagTransportKind,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub top_k: usize,
    pub document_capacity: usize,
    pub document_ttl_secs: Option<u64>,
    pub documents_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub internal_token: Option<SecretString>,
    pub gateway_origin: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingConfig {
    pub media_phrases: Vec<String>,
    pub cards_phrases: Vec<String>,
    pub ingest_phrases: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RagServiceConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagTransportKind {
    InProcess,
    Http,
    Mcp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub force_tool: Option<String>,
    pub rag_transport: Option<RagTransportKind>,
    pub rag_base_url: Option<String>,
    pub rag_timeout_secs: Option<u64>,
    pub internal_token: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_MEDIA_PHRASES: &[&str] =
    &["describe this image", "what is in this image", "describe the photo", "describe the picture"];
pub const DEFAULT_CARDS_PHRASES: &[&str] = &[
    "make flashcards",
    "generate flashcards",
    "create cards",
    "turn into flashcards",
    "quiz me",
    "make a quiz",
];
pub const DEFAULT_INGEST_PHRASES: &[&str] = &[
    "upload",
    "ingest",
    "train on",
    "add to knowledge base",
    "index this",
    "save this document",
];

fn phrase_list(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|phrase| phrase.to_string()).collect()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            media_phrases: phrase_list(DEFAULT_MEDIA_PHRASES),
            cards_phrases: phrase_list(DEFAULT_CARDS_PHRASES),
            ingest_phrases: phrase_list(DEFAULT_INGEST_PHRASES),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                force_tool: None,
            },
            rag: RagBackendConfig {
                transport: RagTransportKind::InProcess,
                base_url: None,
                timeout_secs: 20,
                top_k: 4,
                document_capacity: 1024,
                document_ttl_secs: None,
                documents_dir: None,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://gateway-api.internal".to_string()],
                internal_token: None,
                gateway_origin: "http://gateway-api.internal".to_string(),
            },
            llm: LlmConfig { base_url: None, model: None, timeout_secs: 60 },
            routing: RoutingConfig::default(),
            rag_service: RagServiceConfig { bind_address: "127.0.0.1".to_string(), port: 8001 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for RagTransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "in_process" | "inprocess" | "local" => Ok(Self::InProcess),
            "http" => Ok(Self::Http),
            "mcp" => Ok(Self::Mcp),
            other => Err(ConfigError::Validation(format!(
                "unsupported rag transport `{other}` (expected in_process|http|mcp)"
            ))),
        }
    }
}

impl RagTransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProcess => "in_process",
            Self::Http => "http",
            Self::Mcp => "mcp",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::InProcess)
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("relay.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides)?;
        config.validate()?;

        Ok(config)
    }

    pub fn rag_endpoint(&self) -> Option<&str> {
        self.rag.base_url.as_deref().map(|url| url.trim_end_matches('/'))
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(gateway) = patch.gateway {
            if let Some(bind_address) = gateway.bind_address {
                self.gateway.bind_address = bind_address;
            }
            if let Some(port) = gateway.port {
                self.gateway.port = port;
            }
            if let Some(force_tool) = gateway.force_tool {
                self.gateway.force_tool = parse_force_tool(&force_tool)?;
            }
        }

        if let Some(rag) = patch.rag {
            if let Some(transport) = rag.transport {
                self.rag.transport = transport;
            }
            if let Some(base_url) = rag.base_url {
                self.rag.base_url = Some(base_url);
            }
            if let Some(timeout_secs) = rag.timeout_secs {
                self.rag.timeout_secs = timeout_secs;
            }
            if let Some(top_k) = rag.top_k {
                self.rag.top_k = top_k;
            }
            if let Some(document_capacity) = rag.document_capacity {
                self.rag.document_capacity = document_capacity;
            }
            if let Some(document_ttl_secs) = rag.document_ttl_secs {
                self.rag.document_ttl_secs = Some(document_ttl_secs);
            }
            if let Some(documents_dir) = rag.documents_dir {
                self.rag.documents_dir = Some(documents_dir);
            }
        }

        if let Some(security) = patch.security {
            if let Some(allowed_origins) = security.allowed_origins {
                self.security.allowed_origins = allowed_origins;
            }
            if let Some(internal_token_value) = security.internal_token {
                self.security.internal_token = Some(secret_value(internal_token_value));
            }
            if let Some(gateway_origin) = security.gateway_origin {
                self.security.gateway_origin = gateway_origin;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = Some(model);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(routing) = patch.routing {
            if let Some(media_phrases) = routing.media_phrases {
                self.routing.media_phrases = media_phrases;
            }
            if let Some(cards_phrases) = routing.cards_phrases {
                self.routing.cards_phrases = cards_phrases;
            }
            if let Some(ingest_phrases) = routing.ingest_phrases {
                self.routing.ingest_phrases = ingest_phrases;
            }
        }

        if let Some(rag_service) = patch.rag_service {
            if let Some(bind_address) = rag_service.bind_address {
                self.rag_service.bind_address = bind_address;
            }
            if let Some(port) = rag_service.port {
                self.rag_service.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RELAY_GATEWAY_BIND_ADDRESS") {
            self.gateway.bind_address = value;
        }
        if let Some(value) = read_env("RELAY_GATEWAY_PORT") {
            self.gateway.port = parse_u16("RELAY_GATEWAY_PORT", &value)?;
        }
        if let Some(value) = read_env("RELAY_FORCE_TOOL") {
            self.gateway.force_tool = parse_force_tool(&value)?;
        }

        if let Some(value) = read_env("RELAY_RAG_TRANSPORT") {
            self.rag.transport = value.parse()?;
        }
        if let Some(value) = read_env("RELAY_RAG_BASE_URL") {
            self.rag.base_url = Some(value);
        }
        if let Some(value) = read_env("RELAY_HTTP_TIMEOUT_SECS") {
            self.rag.timeout_secs = parse_u64("RELAY_HTTP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("RELAY_RAG_TOP_K") {
            self.rag.top_k = parse_usize("RELAY_RAG_TOP_K", &value)?;
        }
        if let Some(value) = read_env("RELAY_RAG_DOCUMENTS_DIR") {
            self.rag.documents_dir = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("RELAY_ALLOWED_MCP_ORIGINS") {
            self.security.allowed_origins = split_list(&value);
        }
        if let Some(value) = read_env("RELAY_INTERNAL_MCP_TOKEN") {
            self.security.internal_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("RELAY_GATEWAY_ORIGIN") {
            self.security.gateway_origin = value;
        }

        if let Some(value) = read_env("RELAY_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("RELAY_LLM_MODEL") {
            self.llm.model = Some(value);
        }
        if let Some(value) = read_env("RELAY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("RELAY_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RELAY_ROUTING_MEDIA_PHRASES") {
            self.routing.media_phrases = split_list(&value);
        }
        if let Some(value) = read_env("RELAY_ROUTING_CARDS_PHRASES") {
            self.routing.cards_phrases = split_list(&value);
        }
        if let Some(value) = read_env("RELAY_ROUTING_INGEST_PHRASES") {
            self.routing.ingest_phrases = split_list(&value);
        }

        if let Some(value) = read_env("RELAY_RAG_SERVICE_BIND_ADDRESS") {
            self.rag_service.bind_address = value;
        }
        if let Some(value) = read_env("RELAY_RAG_SERVICE_PORT") {
            self.rag_service.port = parse_u16("RELAY_RAG_SERVICE_PORT", &value)?;
        }

        let log_level = read_env("RELAY_LOGGING_LEVEL").or_else(|| read_env("RELAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("RELAY_LOGGING_FORMAT").or_else(|| read_env("RELAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(force_tool) = overrides.force_tool {
            self.gateway.force_tool = parse_force_tool(&force_tool)?;
        }
        if let Some(rag_transport) = overrides.rag_transport {
            self.rag.transport = rag_transport;
        }
        if let Some(rag_base_url) = overrides.rag_base_url {
            self.rag.base_url = Some(rag_base_url);
        }
        if let Some(rag_timeout_secs) = overrides.rag_timeout_secs {
            self.rag.timeout_secs = rag_timeout_secs;
        }
        if let Some(internal_token) = overrides.internal_token {
            self.security.internal_token = Some(secret_value(internal_token));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = Some(llm_model);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gateway(&self.gateway)?;
        validate_rag(&self.rag)?;
        validate_security(&self.security, self.rag.transport)?;
        validate_llm(&self.llm)?;
        validate_routing(&self.routing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("relay.toml"), PathBuf::from("config/relay.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn parse_force_tool(value: &str) -> Result<Option<ToolDecision>, ConfigError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    value
        .parse::<ToolDecision>()
        .map(Some)
        .map_err(|error| ConfigError::Validation(format!("gateway.force_tool: {error}")))
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_gateway(gateway: &GatewayConfig) -> Result<(), ConfigError> {
    if gateway.port == 0 {
        return Err(ConfigError::Validation("gateway.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_rag(rag: &RagBackendConfig) -> Result<(), ConfigError> {
    if rag.timeout_secs == 0 || rag.timeout_secs > 300 {
        return Err(ConfigError::Validation("rag.timeout_secs must be in range 1..=300".to_string()));
    }

    if rag.top_k == 0 {
        return Err(ConfigError::Validation("rag.top_k must be greater than zero".to_string()));
    }

    if rag.document_capacity == 0 {
        return Err(ConfigError::Validation(
            "rag.document_capacity must be greater than zero".to_string(),
        ));
    }

    if rag.transport.is_remote() {
        let base_url = rag.base_url.as_deref().map(str::trim).unwrap_or_default();
        if base_url.is_empty() {
            return Err(ConfigError::Validation(format!(
                "rag.base_url is required for the `{}` transport",
                rag.transport.as_str()
            )));
        }
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "rag.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_security(
    security: &SecurityConfig,
    transport: RagTransportKind,
) -> Result<(), ConfigError> {
    if security.allowed_origins.iter().any(|origin| origin.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "security.allowed_origins must not contain empty entries".to_string(),
        ));
    }

    if transport == RagTransportKind::Mcp {
        let missing = security
            .internal_token
            .as_ref()
            .map(|token| token.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "security.internal_token is required for the `mcp` transport".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation("llm.timeout_secs must be in range 1..=300".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
        let missing_model = llm.model.as_ref().map(|model| model.trim().is_empty()).unwrap_or(true);
        if missing_model {
            return Err(ConfigError::Validation(
                "llm.model is required when llm.base_url is set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_routing(routing: &RoutingConfig) -> Result<(), ConfigError> {
    let categories = [
        ("routing.media_phrases", &routing.media_phrases),
        ("routing.cards_phrases", &routing.cards_phrases),
        ("routing.ingest_phrases", &routing.ingest_phrases),
    ];

    let mut seen: Vec<(String, &str)> = Vec::new();
    for (category, phrases) in categories {
        for phrase in phrases.iter() {
            let normalized = phrase.trim().to_lowercase();
            if normalized.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{category} must not contain empty phrases"
                )));
            }
            if let Some((_, owner)) =
                seen.iter().find(|(known, owner)| *known == normalized && *owner != category)
            {
                return Err(ConfigError::Validation(format!(
                    "trigger phrase `{normalized}` appears in both {owner} and {category}"
                )));
            }
            seen.push((normalized, category));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    if logging.level.trim().is_empty() {
        return Err(ConfigError::Validation("logging.level must not be empty".to_string()));
    }
    EnvFilter::try_new(logging.level.trim()).map(|_| ()).map_err(|error| {
        ConfigError::Validation(format!("logging.level is not a valid filter directive: {error}"))
    })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gateway: Option<GatewayPatch>,
    rag: Option<RagPatch>,
    security: Option<SecurityPatch>,
    llm: Option<LlmPatch>,
    routing: Option<RoutingPatch>,
    rag_service: Option<RagServicePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    force_tool: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RagPatch {
    transport: Option<RagTransportKind>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    top_k: Option<usize>,
    document_capacity: Option<usize>,
    document_ttl_secs: Option<u64>,
    documents_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SecurityPatch {
    allowed_origins: Option<Vec<String>>,
    internal_token: Option<String>,
    gateway_origin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RoutingPatch {
    media_phrases: Option<Vec<String>>,
    cards_phrases: Option<Vec<String>>,
    ingest_phrases: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RagServicePatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
