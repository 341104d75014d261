use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use relay_agent::GatewayDispatcher;
use relay_core::{new_trace_id, AskRequest, GatewayError, InterfaceError, ResponseEnvelope};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Clone)]
pub struct ApiState {
    dispatcher: Arc<GatewayDispatcher>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub trace_id: String,
}

pub struct ApiError(InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // upstream detail is exposed; internal detail stays in the logs
        let detail = match &error {
            InterfaceError::BadRequest { message, .. }
            | InterfaceError::BadGateway { message, .. } => message.clone(),
            InterfaceError::Internal { .. } => error.user_message().to_string(),
        };
        if status.is_server_error() {
            error!(
                event_name = "gateway.api.error",
                trace_id = %error.trace_id(),
                status = status.as_u16(),
                error = %error,
                "request failed"
            );
        }
        let body = ErrorBody { detail, trace_id: error.trace_id().to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn router(dispatcher: Arc<GatewayDispatcher>) -> Router {
    Router::new().route("/v1/agent/ask", post(ask)).with_state(ApiState { dispatcher })
}

pub async fn ask(
    State(state): State<ApiState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let trace_id = new_trace_id();
            warn!(
                event_name = "gateway.api.rejected",
                trace_id = %trace_id,
                error = %rejection,
                "request body rejected"
            );
            let error = GatewayError::Validation(rejection.body_text()).into_interface(trace_id);
            return Err(error.into());
        }
    };

    if let Err(error) = request.validate() {
        return Err(error.into_interface(new_trace_id()).into());
    }

    let envelope = state.dispatcher.ask(&request).await.map_err(|error| error.into_interface())?;
    Ok(Json(envelope))
}
