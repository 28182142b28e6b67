//! qr-core: Core types and traits for quick-research
//!
//! This crate provides the chat message types, the `Provider` and `Tool`
//! traits, and the bounded agent loop shared by the rest of the workspace.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{Agent, AgentConfig, DEFAULT_MAX_ITERATIONS};
pub use error::Error;
pub use message::{Message, Role, ToolCall, Usage};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use tool::{
    text_argument, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters, ToolRegistry,
};

pub type Result<T> = std::result::Result<T, Error>;
