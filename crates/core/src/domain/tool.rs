use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of tools the gateway can route a request to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolDecision {
    Rag,
    Media,
    Cards,
    Ingest,
    #[serde(rename = "none")]
    NoTool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown tool `{0}` (expected rag|media|cards|ingest|none)")]
pub struct UnknownTool(pub String);

impl ToolDecision {
    pub const ALL: [ToolDecision; 5] =
        [Self::Rag, Self::Media, Self::Cards, Self::Ingest, Self::NoTool];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rag => "rag",
            Self::Media => "media",
            Self::Cards => "cards",
            Self::Ingest => "ingest",
            Self::NoTool => "none",
        }
    }

    /// Only the rag path may carry sources and latency.
    pub fn carries_attribution(&self) -> bool {
        matches!(self, Self::Rag)
    }
}

impl fmt::Display for ToolDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolDecision {
    type Err = UnknownTool;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rag" => Ok(Self::Rag),
            "media" => Ok(Self::Media),
            "cards" => Ok(Self::Cards),
            "ingest" => Ok(Self::Ingest),
            "none" => Ok(Self::NoTool),
            other => Err(UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ToolDecision, UnknownTool};

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" RAG ".parse::<ToolDecision>(), Ok(ToolDecision::Rag));
        assert_eq!("None".parse::<ToolDecision>(), Ok(ToolDecision::NoTool));
        assert_eq!("video".parse::<ToolDecision>(), Err(UnknownTool("video".to_string())));
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let encoded = serde_json::to_string(&ToolDecision::ALL).expect("serialize");
        assert_eq!(encoded, r#"["rag","media","cards","ingest","none"]"#);
    }
}
