//! Shared domain types, error taxonomy, configuration and the session arena
//! used by the relay gateway and its RAG service.

pub mod config;
pub mod domain;
pub mod errors;
pub mod session;

pub use domain::request::AskRequest;
pub use domain::response::{new_trace_id, RagResult, ResponseEnvelope, SourceRef};
pub use domain::tool::{ToolDecision, UnknownTool};
pub use errors::{GatewayError, InterfaceError};
pub use session::{SessionArena, SessionKey};
