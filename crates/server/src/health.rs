use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

pub const SERVICE_NAME: &str = "relay-gateway";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RootResponse {
    pub service: &'static str,
    pub status: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub checked_at: String,
}

pub fn router() -> Router {
    Router::new().route("/", get(root)).route("/health", get(health))
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse { service: SERVICE_NAME, status: "running" })
}

/// Liveness only; backend reachability is reported by `relay doctor`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true, service: SERVICE_NAME, checked_at: Utc::now().to_rfc3339() })
}

#[cfg(test)]
mod tests {
    use super::{health, root, SERVICE_NAME};

    #[tokio::test]
    async fn root_reports_running() {
        let response = root().await;
        assert_eq!(response.0.service, SERVICE_NAME);
        assert_eq!(response.0.status, "running");
    }

    #[tokio::test]
    async fn health_is_ok_with_timestamp() {
        let response = health().await;
        assert!(response.0.ok);
        assert_eq!(response.0.service, "relay-gateway");
        assert!(chrono::DateTime::parse_from_rfc3339(&response.0.checked_at).is_ok());
    }
}
