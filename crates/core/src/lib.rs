//! # Stepwise Core
//!
//! Domain types, traits, and error definitions for the Stepwise agent
//! execution loop. This crate has **no runtime dependencies** beyond the
//! trait plumbing; it defines the model every other crate implements
//! against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the loop is a trait here:
//! - [`Agent`] decides what to do next
//! - [`Tool`] performs one external action
//! - [`Memory`] carries conversation state across calls
//! - [`Llm`] is the backend a policy may consult
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stand-ins for any of them.

pub mod agent;
pub mod error;
pub mod llm;
pub mod memory;
pub mod prompt;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, AgentDecision};
pub use error::{AgentError, Error, MemoryError, PromptError, ProviderError, Result, ToolError};
pub use llm::Llm;
pub use memory::Memory;
pub use prompt::{ConditionalPromptSelector, PromptSelector, PromptTemplate};
pub use schema::{AgentAction, AgentFinish, AgentStep, StopReason, Values};
pub use tool::{Tool, ToolRegistry};
