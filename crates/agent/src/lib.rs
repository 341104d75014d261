//! Agent gateway runtime: intent routing and tool dispatch.
//!
//! This crate is the routing layer between a caller's message and the tool
//! that answers it:
//! - Classifies each message into exactly one [`ToolDecision`](relay_core::ToolDecision)
//! - Holds one backend per decision and invokes it under a timeout
//! - Reaches the RAG backend in-process, over plain HTTP, or over the tool protocol
//!
//! # Architecture
//!
//! A request flows through a fixed sequence:
//! 1. **Decision** (`classifier`) - forced override or first matching rule
//! 2. **Dispatch** (`dispatcher`) - trace id, backend lookup, timeout
//! 3. **Backend** (`tools`) - RAG or a placeholder
//! 4. **Transport** (`transport`) - reply normalized into a `RagResult`
//!
//! # Key Types
//!
//! - `GatewayDispatcher` - the per-request orchestrator
//! - `AgentRuntime` - dispatcher wired from `AppConfig` (see `runtime` module)
//! - `RagTransport` - pluggable trait for in-process, HTTP and MCP backends
//!
//! # Failure Principle
//!
//! A placeholder tool is a successful reply, never an error. Only backend
//! unavailability, malformed replies and invalid input surface as
//! `GatewayError`.

pub mod classifier;
pub mod dispatcher;
pub mod runtime;
pub mod tools;
pub mod transport;

pub use classifier::{IntentClassifier, RouteRule, TriggerPhrases};
pub use dispatcher::{GatewayDispatcher, TracedError};
pub use runtime::AgentRuntime;
pub use tools::{ToolBackend, ToolOutcome, ToolRegistry};
pub use transport::{RagReply, RagTransport, TransportFailure};
