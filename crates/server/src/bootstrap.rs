use relay_agent::AgentRuntime;
use relay_core::config::AppConfig;
use relay_core::GatewayError;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: AgentRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("gateway runtime could not be built: {0}")]
    Runtime(#[source] GatewayError),
}

/// Builds the runtime from an already loaded config. Loading happens first in
/// `main` so logging is initialized before anything else runs.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting gateway bootstrap");
    let runtime = AgentRuntime::from_config(&config).map_err(BootstrapError::Runtime)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        transport = config.rag.transport.as_str(),
        "gateway runtime initialized"
    );

    Ok(Application { config, runtime })
}
