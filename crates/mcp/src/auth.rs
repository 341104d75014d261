//! Origin and bearer-token guard for the tool-protocol endpoint.
//!
//! The origin is checked first, so a request from an unknown origin is
//! refused with 403 even when it carries a valid token.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, ORIGIN};
use axum::http::{HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::config::SecurityConfig;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    InvalidOrigin,
    Unauthorized,
}

impl Denial {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrigin => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Self::InvalidOrigin => "Invalid Origin",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Allowed,
    Denied(Denial),
}

impl AuthResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Clone, Debug)]
pub struct McpGuard {
    allowed_origins: Arc<HashSet<String>>,
    token: Option<SecretString>,
}

impl McpGuard {
    /// With no token configured every request is refused as unauthorized.
    pub fn new(
        allowed_origins: impl IntoIterator<Item = String>,
        token: Option<SecretString>,
    ) -> Self {
        let allowed_origins = allowed_origins
            .into_iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        Self { allowed_origins: Arc::new(allowed_origins), token }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.allowed_origins.clone(), security.internal_token.clone())
    }

    pub fn is_token_configured(&self) -> bool {
        self.token.as_ref().is_some_and(|token| !token.expose_secret().is_empty())
    }

    pub fn check(&self, origin: Option<&str>, authorization: Option<&str>) -> AuthResult {
        if !origin.is_some_and(|origin| self.allowed_origins.contains(origin)) {
            return AuthResult::Denied(Denial::InvalidOrigin);
        }

        let presented = authorization.and_then(|value| value.strip_prefix("Bearer "));
        match (&self.token, presented) {
            (Some(expected), Some(presented))
                if !presented.is_empty() && presented == expected.expose_secret() =>
            {
                AuthResult::Allowed
            }
            _ => AuthResult::Denied(Denial::Unauthorized),
        }
    }
}

/// Axum middleware applying [`McpGuard::check`] before any tool logic runs.
pub async fn require_mcp_auth(
    State(guard): State<McpGuard>,
    request: Request,
    next: Next,
) -> Response {
    // Header borrows must end before the request moves into `next`.
    let verdict = {
        let header =
            |name: HeaderName| request.headers().get(name).and_then(|value| value.to_str().ok());
        guard.check(header(ORIGIN), header(AUTHORIZATION))
    };

    match verdict {
        AuthResult::Allowed => {
            debug!(path = %request.uri().path(), "mcp request authorized");
            next.run(request).await
        }
        AuthResult::Denied(denial) => {
            warn!(
                event_name = "rag_service.mcp.denied",
                reason = denial.detail(),
                path = %request.uri().path(),
                "mcp request refused"
            );
            (denial.status_code(), Json(json!({ "detail": denial.detail() }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{AuthResult, Denial, McpGuard};

    const ORIGIN: &str = "http://gateway-api.internal";

    fn guard() -> McpGuard {
        McpGuard::new(
            vec![ORIGIN.to_string(), " http://other.internal ".to_string()],
            Some(SecretString::from("s3cret".to_string())),
        )
    }

    #[test]
    fn allowed_origin_and_token_pass() {
        assert!(guard().check(Some(ORIGIN), Some("Bearer s3cret")).is_allowed());
        assert!(guard().check(Some("http://other.internal"), Some("Bearer s3cret")).is_allowed());
    }

    #[test]
    fn origin_is_checked_before_token() {
        assert_eq!(
            guard().check(Some("http://evil.example"), Some("Bearer s3cret")),
            AuthResult::Denied(Denial::InvalidOrigin)
        );
        assert_eq!(
            guard().check(None, Some("Bearer s3cret")),
            AuthResult::Denied(Denial::InvalidOrigin)
        );
        assert_eq!(
            guard().check(Some("http://evil.example"), None),
            AuthResult::Denied(Denial::InvalidOrigin)
        );
    }

    #[test]
    fn wrong_or_missing_token_is_unauthorized() {
        for authorization in [None, Some("Bearer nope"), Some("s3cret"), Some("Basic s3cret")] {
            assert_eq!(
                guard().check(Some(ORIGIN), authorization),
                AuthResult::Denied(Denial::Unauthorized),
                "{authorization:?}"
            );
        }
    }

    #[test]
    fn unconfigured_token_refuses_everything() {
        let guard = McpGuard::new(vec![ORIGIN.to_string()], None);
        assert!(!guard.is_token_configured());
        assert_eq!(
            guard.check(Some(ORIGIN), Some("Bearer ")),
            AuthResult::Denied(Denial::Unauthorized)
        );
    }

    #[test]
    fn denial_bodies_match_the_wire_contract() {
        assert_eq!(Denial::InvalidOrigin.status_code().as_u16(), 403);
        assert_eq!(Denial::InvalidOrigin.detail(), "Invalid Origin");
        assert_eq!(Denial::Unauthorized.status_code().as_u16(), 401);
        assert_eq!(Denial::Unauthorized.detail(), "Unauthorized");
    }
}
