//! Error types for the Stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the executor folds them
//! into [`Error`] together with the step history accumulated so far.

use thiserror::Error;

use crate::schema::{AgentStep, StopReason};

/// The top-level error type for all Stepwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Loop termination ---
    #[error("Agent not finished: {reason} reached after {} steps", steps.len())]
    NotFinished {
        reason: StopReason,
        steps: Vec<AgentStep>,
    },

    #[error("Execution cancelled after {} steps", steps.len())]
    Cancelled { steps: Vec<AgentStep> },

    // --- Fatal collaborator failures ---
    #[error("Agent error: {source}")]
    Agent {
        source: AgentError,
        steps: Vec<AgentStep>,
    },

    #[error("Tool error: {source}")]
    Tool {
        source: ToolError,
        steps: Vec<AgentStep>,
    },

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The step history accumulated before the loop stopped, if this error
    /// came out of a running loop.
    pub fn steps(&self) -> Option<&[AgentStep]> {
        match self {
            Self::NotFinished { steps, .. }
            | Self::Cancelled { steps }
            | Self::Agent { steps, .. }
            | Self::Tool { steps, .. } => Some(steps),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures raised by an [`Agent`](crate::Agent) while planning.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The policy's raw output could not be turned into actions or a finish.
    #[error("unable to parse agent output: {output}")]
    ParseOutput { output: String },

    #[error("agent returned neither actions nor a finish")]
    EmptyDecision,

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Prompt(#[from] PromptError),

    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn parse(output: impl Into<String>) -> Self {
        Self::ParseOutput {
            output: output.into(),
        }
    }

    /// Whether this is an output-format failure that a parser error handler
    /// may turn into an observation.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseOutput { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// A failure the tool does not want the agent to retry around.
    #[error("Tool failed fatally: {tool_name}: {reason}")]
    Fatal { tool_name: String, reason: String },
}

impl ToolError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum PromptError {
    #[error("missing prompt variable: {0}")]
    MissingVariable(String),

    #[error("unclosed placeholder in template at byte {0}")]
    UnclosedPlaceholder(usize),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ambiguous memory key: {0}")]
    AmbiguousKey(String),
}
