//! Recovery policy for agent output that could not be parsed.
//!
//! When enabled on an executor, a parse failure does not end the call:
//! the handler renders the error as an observation and the agent gets to
//! see its own mistake on the next iteration.

use std::fmt;
use std::sync::Arc;

use stepwise_core::error::AgentError;

type Formatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub struct ParserErrorHandler {
    formatter: Option<Formatter>,
}

impl ParserErrorHandler {
    /// Observation = the error's message, unchanged.
    pub fn new() -> Self {
        Self { formatter: None }
    }

    /// Observation = `formatter(error message)`.
    pub fn with_formatter(formatter: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            formatter: Some(Arc::new(formatter)),
        }
    }

    pub fn handle(&self, error: &AgentError) -> String {
        let message = error.to_string();
        match &self.formatter {
            Some(format) => format(&message),
            None => message,
        }
    }
}

impl fmt::Debug for ParserErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserErrorHandler")
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_returns_error_text() {
        let err = AgentError::parse("Thought: hmm");
        assert_eq!(ParserErrorHandler::new().handle(&err), err.to_string());
    }

    #[test]
    fn formatter_wraps_error_text() {
        let handler = ParserErrorHandler::with_formatter(|msg| {
            format!("Invalid format ({msg}). Use 'Action:' and 'Action Input:'.")
        });
        let out = handler.handle(&AgentError::parse("oops"));
        assert!(out.starts_with("Invalid format (unable to parse agent output: oops)"));
    }

    #[test]
    fn handling_is_deterministic() {
        let handler = ParserErrorHandler::with_formatter(|msg| msg.to_uppercase());
        let err = AgentError::parse("x");
        assert_eq!(handler.handle(&err), handler.handle(&err));
    }
}
