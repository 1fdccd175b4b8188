//! Agent patterns: decision policies the executor can drive.
//!
//! - **ReAct**: a language model reasons, picks a tool, reads the
//!   observation, and repeats until it can answer
//! - **Rule-based**: regex routing to a single tool call, no model

pub mod prompts;
pub mod react;
pub mod rule_based;

pub use react::{ReactAgent, ReactStyle};
pub use rule_based::{Rule, RuleBasedAgent};
