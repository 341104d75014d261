use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use relay_rag::schema::{AskPayload, AskReply};
use relay_rag::RagPipeline;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{require_mcp_auth, McpGuard};
use crate::server::RagMcpServer;
use crate::{McpError, McpResult};

pub const SERVICE_NAME: &str = "rag-service";

#[derive(Clone)]
pub struct ServiceState {
    pipeline: RagPipeline,
    guard: McpGuard,
}

impl ServiceState {
    pub fn new(pipeline: RagPipeline, guard: McpGuard) -> Self {
        Self { pipeline, guard }
    }
}

/// `/health`, `/ask`, and the guarded `/mcp` endpoint over one pipeline.
pub fn router(state: ServiceState) -> Router {
    let server = RagMcpServer::new(state.pipeline.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let mcp_routes = Router::new()
        .nest_service("/mcp", mcp_service)
        .layer(middleware::from_fn_with_state(state.guard.clone(), require_mcp_auth));

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .with_state(state)
        .merge(mcp_routes)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": SERVICE_NAME }))
}

async fn ask(
    State(state): State<ServiceState>,
    Json(payload): Json<AskPayload>,
) -> McpResult<Json<AskReply>> {
    let outcome = state.pipeline.run(&payload.question).await?;
    let reply = AskReply::from(outcome);
    info!(
        event_name = "rag_service.ask.completed",
        status = ?reply.status,
        sources = reply.sources.len(),
        latency_ms = ?reply.latency_ms,
        "ask served"
    );
    Ok(Json(reply))
}

impl IntoResponse for McpError {
    fn into_response(self) -> Response {
        let status = match &self {
            McpError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            McpError::Backend(_) => StatusCode::BAD_GATEWAY,
            McpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(event_name = "rag_service.ask.failed", error = %self, "ask failed");
        }
        let detail = match self {
            McpError::Validation(message) => message,
            McpError::Backend(detail) | McpError::Internal(detail) => detail,
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
