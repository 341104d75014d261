//! Relay RAG service
//!
//! Exposes the retrieval-augmented generation pipeline to the gateway over
//! two surfaces sharing one pipeline instance:
//!
//! - `/mcp`: streamable-HTTP tool-protocol endpoint with a single `ask` tool,
//!   guarded by an Origin allow-list and a bearer token
//! - `/ask` and `/health`: plain JSON endpoints for direct HTTP callers
//!
//! The same server also runs over stdio for local tool clients.
//!
//! ## Example Usage
//!
//! ```no_run
//! use relay_core::config::AppConfig;
//! use relay_mcp::{router, McpGuard, ServiceState};
//! use relay_rag::RagPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let (pipeline, _retriever) = RagPipeline::from_config(&config)?;
//!     let app = router(ServiceState::new(pipeline, McpGuard::from_config(&config.security)));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8001").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

mod auth;
mod server;
mod service;

pub use auth::{require_mcp_auth, AuthResult, Denial, McpGuard};
pub use server::{AskToolInput, RagMcpServer};
pub use service::{router, ServiceState, SERVICE_NAME};

use relay_rag::RagError;
use thiserror::Error;

/// Errors specific to RAG service operations
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum McpError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// JSON-RPC error code for the tool protocol.
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Validation(_) => -32602,
            McpError::Backend(_) => -32000,
            McpError::Internal(_) => -32603,
        }
    }
}

impl From<RagError> for McpError {
    fn from(error: RagError) -> Self {
        match error {
            RagError::Validation(message) => Self::Validation(message),
            error @ RagError::Backend { .. } => Self::Backend(error.to_string()),
            // the pipeline reports stubs as an outcome, never as an error
            error @ RagError::NotImplemented { .. } => Self::Internal(error.to_string()),
        }
    }
}

/// Result type for RAG service operations
pub type McpResult<T> = Result<T, McpError>;
