mod api;
mod bootstrap;
mod health;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use relay_agent::GatewayDispatcher;
use relay_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub fn app(dispatcher: Arc<GatewayDispatcher>) -> Router {
    health::router().merge(api::router(dispatcher))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app_state = bootstrap::bootstrap_with_config(config)?;
    let address =
        format!("{}:{}", app_state.config.gateway.bind_address, app_state.config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        transport = app_state.config.rag.transport.as_str(),
        "relay gateway started"
    );
    axum::serve(listener, app(app_state.runtime.dispatcher.clone()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;
    tracing::info!(event_name = "system.server.stopping", "relay gateway stopping");

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use relay_agent::AgentRuntime;
    use relay_core::config::AppConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::app;

    async fn get(path: &str) -> (StatusCode, Value) {
        let runtime = AgentRuntime::from_config(&AppConfig::default()).expect("runtime");
        let response = app(Arc::clone(&runtime.dispatcher))
            .oneshot(Request::get(path).body(Body::empty()).expect("request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn root_and_health_are_mounted() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "relay-gateway");
        assert_eq!(body["status"], "running");

        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
