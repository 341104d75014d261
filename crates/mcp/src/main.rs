//! Relay RAG Service Binary
//!
//! Serves the RAG pipeline over HTTP (`/ask`, `/health`, `/mcp`) or, with
//! `--stdio`, as a tool server on stdin/stdout.
//!
//! ## Usage
//!
//! ```bash
//! # HTTP on rag_service.bind_address:rag_service.port
//! RELAY_INTERNAL_MCP_TOKEN=... relay-rag-service
//!
//! # Load plain-text documents into the retriever
//! RELAY_RAG_DOCUMENTS_DIR=./docs relay-rag-service
//!
//! # Tool server over stdio
//! relay-rag-service --stdio
//! ```

use anyhow::{Context, Result};
use relay_core::config::{AppConfig, LoadOptions, LogFormat};
use relay_mcp::{router, McpGuard, RagMcpServer, ServiceState};
use relay_rag::RagPipeline;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// stdout belongs to the protocol in stdio mode, so logs always go to stderr
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let stdio = std::env::args().skip(1).any(|arg| arg == "--stdio");

    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let (pipeline, retriever) =
        RagPipeline::from_config(&config).context("rag pipeline could not be built")?;
    info!(
        event_name = "rag_service.pipeline.ready",
        documents = retriever.document_count().await,
        "rag pipeline ready"
    );

    if stdio {
        return RagMcpServer::new(pipeline).run_stdio().await;
    }

    let guard = McpGuard::from_config(&config.security);
    if !guard.is_token_configured() {
        warn!(
            event_name = "rag_service.mcp.no_token",
            "security.internal_token is not set; every /mcp request will be refused"
        );
    }

    let address = format!("{}:{}", config.rag_service.bind_address, config.rag_service.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;
    info!(event_name = "rag_service.started", address = %address, "rag service listening");

    axum::serve(listener, router(ServiceState::new(pipeline, guard)))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!(event_name = "rag_service.stopped", "rag service stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(
            event_name = "rag_service.signal_error",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}
