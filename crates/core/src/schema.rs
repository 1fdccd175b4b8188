//! Value types exchanged between the executor and an agent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named string values flowing into and out of an executor call.
///
/// Ordered so that prompts and observations built from them render the
/// same way on every run.
pub type Values = BTreeMap<String, String>;

/// A single requested tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Name of the tool to run
    pub tool: String,

    /// Raw input handed to the tool
    pub tool_input: String,

    /// The policy's rationale, verbatim (replayed into later prompts)
    #[serde(default)]
    pub log: String,
}

impl AgentAction {
    pub fn new(tool: impl Into<String>, tool_input: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_input: tool_input.into(),
            log: String::new(),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Synthetic steps (recovered parse errors) carry an empty action.
    pub fn is_empty(&self) -> bool {
        self.tool.is_empty() && self.tool_input.is_empty() && self.log.is_empty()
    }
}

/// The terminal decision of an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFinish {
    pub return_values: Values,

    #[serde(default)]
    pub log: String,
}

impl AgentFinish {
    /// A finish with a single output value.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut return_values = Values::new();
        return_values.insert(key.into(), value.into());
        Self {
            return_values,
            log: String::new(),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }
}

/// One entry of the step history: an action and what came back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub action: AgentAction,
    pub observation: String,
}

impl AgentStep {
    pub fn new(action: AgentAction, observation: impl Into<String>) -> Self {
        Self {
            action,
            observation: observation.into(),
        }
    }

    /// A step with no dispatched action, used for recovered planning errors.
    pub fn synthetic(observation: impl Into<String>) -> Self {
        Self::new(AgentAction::default(), observation)
    }
}

/// Which budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationLimit,
    TimeLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IterationLimit => f.write_str("iteration limit"),
            Self::TimeLimit => f.write_str("time limit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_step_has_empty_action() {
        let step = AgentStep::synthetic("unable to parse agent output");
        assert!(step.action.is_empty());
        assert_eq!(step.observation, "unable to parse agent output");
    }

    #[test]
    fn finish_single_binds_one_value() {
        let finish = AgentFinish::single("output", "42");
        assert_eq!(finish.return_values.len(), 1);
        assert_eq!(finish.return_values["output"], "42");
    }

    #[test]
    fn step_serializes_action_fields() {
        let step = AgentStep::new(
            AgentAction::new("calculator", "2+2").with_log("I should add"),
            "4",
        );
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"tool\":\"calculator\""));
        assert!(json.contains("I should add"));
    }
}
