use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::GatewayError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub message: String,
    #[serde(default)]
    pub has_media: bool,
    #[serde(default)]
    pub meta: Option<Map<String, Value>>,
}

impl AskRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), has_media: false, meta: None }
    }

    pub fn with_media(mut self, has_media: bool) -> Self {
        self.has_media = has_media;
        self
    }

    /// Rejects a zero-length message. Whitespace-only text is accepted so the
    /// classifier can answer it with the `none` tool.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.message.is_empty() {
            return Err(GatewayError::Validation("message must not be empty".to_string()));
        }
        Ok(())
    }
}
