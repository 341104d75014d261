use thiserror::Error;

/// Failure taxonomy for a single gateway request.
///
/// A placeholder tool is deliberately absent here: it produces a well-formed
/// envelope, not an error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("configuration failure: {0}")]
    Config(String),
    #[error("upstream failure: {detail}")]
    Transport { detail: String },
    #[error("upstream protocol violation: {detail}")]
    Protocol { detail: String },
}

impl GatewayError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport { detail: detail.into() }
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol { detail: detail.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Transport { .. } => "transport",
            Self::Protocol { .. } => "protocol",
        }
    }

    /// Transport failures may be retried by the caller; a protocol mismatch
    /// will not change on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn into_interface(self, trace_id: impl Into<String>) -> InterfaceError {
        let trace_id = trace_id.into();
        match self {
            Self::Validation(message) => InterfaceError::BadRequest { message, trace_id },
            Self::Transport { detail } => InterfaceError::BadGateway { message: detail, trace_id },
            Self::Config(message) | Self::Protocol { detail: message } => {
                InterfaceError::Internal { message, trace_id }
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, trace_id: String },
    #[error("upstream failure: {message}")]
    BadGateway { message: String, trace_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, trace_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::BadGateway { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }

    pub fn trace_id(&self) -> &str {
        match self {
            Self::BadRequest { trace_id, .. }
            | Self::BadGateway { trace_id, .. }
            | Self::Internal { trace_id, .. } => trace_id,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::BadGateway { .. } => "A backend tool failed to respond. Please retry shortly.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{GatewayError, InterfaceError};

    #[test]
    fn validation_maps_to_bad_request_with_trace_id() {
        let interface = GatewayError::Validation("empty".to_owned()).into_interface("trace-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref trace_id, .. } if trace_id == "trace-1"
        ));
        assert_eq!(interface.status_code(), 400);
    }

    #[test]
    fn transport_maps_to_bad_gateway_and_keeps_detail() {
        let interface =
            GatewayError::transport("RAG service failed: connection refused").into_interface("t");

        assert_eq!(interface.status_code(), 502);
        assert!(interface.to_string().contains("connection refused"));
        assert_eq!(
            interface.user_message(),
            "A backend tool failed to respond. Please retry shortly."
        );
    }

    #[test]
    fn protocol_and_config_map_to_internal() {
        let protocol = GatewayError::protocol("missing answer").into_interface("t1");
        let config = GatewayError::Config("rag.base_url missing".to_owned()).into_interface("t2");

        assert_eq!(protocol.status_code(), 500);
        assert_eq!(config.status_code(), 500);
        assert_eq!(config.trace_id(), "t2");
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(GatewayError::transport("timeout").is_retryable());
        assert!(!GatewayError::protocol("bad json").is_retryable());
        assert!(!GatewayError::Config("missing".to_owned()).is_retryable());
        assert!(!GatewayError::Validation("empty".to_owned()).is_retryable());
    }
}
