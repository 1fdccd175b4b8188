//! Rule-based pattern: keyword/regex routing, no language model.
//!
//! The first rule whose pattern matches the input dispatches a single tool
//! call; the next plan finishes with that call's observation. Input that
//! no rule matches finishes immediately with a fallback answer. Useful
//! offline and as a deterministic baseline for the executor.

use async_trait::async_trait;
use regex_lite::Regex;
use stepwise_core::agent::{Agent, AgentDecision};
use stepwise_core::error::{AgentError, Error};
use stepwise_core::schema::{AgentAction, AgentFinish, AgentStep, Values};
use tracing::debug;

const DEFAULT_FALLBACK: &str = "I don't know how to help with that.";

/// Route inputs matching `pattern` to `tool`.
///
/// The tool input is the pattern's first capture group, or the whole match
/// when the pattern has none.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    tool: String,
}

impl Rule {
    pub fn new(pattern: &str, tool: impl Into<String>) -> Result<Self, Error> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::config(format!("invalid rule pattern '{pattern}': {e}")))?;
        Ok(Self {
            pattern,
            tool: tool.into(),
        })
    }

    fn action_for(&self, text: &str) -> Option<AgentAction> {
        let captures = self.pattern.captures(text)?;
        let tool_input = captures.get(1).or_else(|| captures.get(0))?.as_str().trim();
        Some(
            AgentAction::new(&self.tool, tool_input)
                .with_log(format!("Matched /{}/ → {}", self.pattern.as_str(), self.tool)),
        )
    }
}

pub struct RuleBasedAgent {
    rules: Vec<Rule>,
    fallback: String,
}

impl RuleBasedAgent {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            fallback: DEFAULT_FALLBACK.into(),
        }
    }

    /// Arithmetic goes to `calculator`, "search …" goes to `web_search`.
    pub fn builtin() -> Result<Self, Error> {
        Ok(Self::new(vec![
            Rule::new(
                r"([-(]*\d[\d.,]*(?:\s*[-+*/^×÷]\s*[-(]*\d[\d.,]*\)*)+)",
                "calculator",
            )?,
            Rule::new(r"(?i)^\s*(?:search|look up|google)(?:\s+for)?\s+(.+)", "web_search")?,
        ]))
    }

    pub fn with_fallback(mut self, answer: impl Into<String>) -> Self {
        self.fallback = answer.into();
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.tool.as_str()).collect()
    }
}

#[async_trait]
impl Agent for RuleBasedAgent {
    async fn plan(&self, steps: &[AgentStep], inputs: &Values) -> Result<AgentDecision, AgentError> {
        if let Some(last) = steps.last() {
            return Ok(AgentDecision::Finish(
                AgentFinish::single("output", last.observation.clone())
                    .with_log("Answering with the tool result"),
            ));
        }

        let text = inputs
            .get("input")
            .ok_or_else(|| AgentError::Other("missing 'input'".into()))?;

        match self.rules.iter().find_map(|rule| rule.action_for(text)) {
            Some(action) => {
                debug!(tool = %action.tool, input = %action.tool_input, "Rule matched");
                Ok(AgentDecision::action(action))
            }
            None => Ok(AgentDecision::Finish(
                AgentFinish::single("output", self.fallback.clone()).with_log("No rule matched"),
            )),
        }
    }

    fn input_keys(&self) -> Vec<String> {
        vec!["input".into()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec!["output".into()]
    }
}
