//! ReAct pattern: Thought → Action → Observation, driven by a language model.
//!
//! The agent renders a prompt containing the tool catalog, the call inputs
//! and a scratchpad replaying every step so far, asks the model to
//! continue it, and parses the continuation:
//!
//! - a finish marker (`Final Answer:` or `AI:`) ends the loop with the text
//!   after the marker
//! - an `Action:` / `Action Input:` pair requests one tool call
//! - anything else is a parse error, which the executor may recover from
//!
//! # Scratchpad Format
//!
//! Each step contributes its log, verbatim, followed by
//! `\nObservation: <observation>\nThought:`. Generation is cut at the next
//! `Observation:` so the model never invents a tool result.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex_lite::Regex;
use stepwise_core::agent::{Agent, AgentDecision};
use stepwise_core::error::AgentError;
use stepwise_core::llm::Llm;
use stepwise_core::prompt::{PromptSelector, PromptTemplate};
use stepwise_core::schema::{AgentAction, AgentFinish, AgentStep, Values};
use stepwise_core::tool::Tool;
use tracing::debug;

use super::prompts;

/// Stop sequences handed to the model on every completion.
pub const STOP_SEQUENCES: [&str; 2] = ["\nObservation:", "\n\tObservation:"];

/// `None` only if the pattern below stops compiling.
static ACTION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*:\s*(.*?)\s*Action\s*Input\s*:\s*(.*)").ok());

/// Which ReAct dialect to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactStyle {
    /// One-shot question answering (`Final Answer:`).
    ZeroShot,
    /// Chat with remembered history (`AI:`).
    Conversational,
}

impl ReactStyle {
    pub fn finish_marker(self) -> &'static str {
        match self {
            Self::ZeroShot => "Final Answer:",
            Self::Conversational => "AI:",
        }
    }

    fn input_keys(self) -> Vec<String> {
        match self {
            Self::ZeroShot => vec!["input".into()],
            Self::Conversational => vec!["input".into(), "history".into()],
        }
    }
}

/// A ReAct policy over an [`Llm`].
pub struct ReactAgent {
    llm: Arc<dyn Llm>,
    /// Selected for `llm` at construction, tool catalog pre-bound.
    prompt: PromptTemplate,
    style: ReactStyle,
    output_key: String,
    stop: Vec<String>,
}

impl ReactAgent {
    /// Zero-shot agent with the stock prompts.
    pub fn zero_shot(llm: Arc<dyn Llm>, tools: &[Arc<dyn Tool>]) -> Self {
        Self::with_selector(ReactStyle::ZeroShot, llm, tools, &prompts::zero_shot_selector())
    }

    /// Conversational agent with the stock prompts. Expects a `history` input,
    /// usually supplied by memory.
    pub fn conversational(llm: Arc<dyn Llm>, tools: &[Arc<dyn Tool>]) -> Self {
        Self::with_selector(
            ReactStyle::Conversational,
            llm,
            tools,
            &prompts::conversational_selector(),
        )
    }

    /// Agent whose prompt is chosen by `selector` for this backend.
    pub fn with_selector(
        style: ReactStyle,
        llm: Arc<dyn Llm>,
        tools: &[Arc<dyn Tool>],
        selector: &dyn PromptSelector,
    ) -> Self {
        let prompt = selector.get_prompt(llm.as_ref()).clone();
        debug!(llm = %llm.name(), model = %llm.model(), ?style, "ReactAgent prompt selected");
        Self {
            prompt: bind_tools(prompt, tools),
            llm,
            style,
            output_key: "output".into(),
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = key.into();
        self
    }

    pub fn style(&self) -> ReactStyle {
        self.style
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }
}

#[async_trait]
impl Agent for ReactAgent {
    async fn plan(&self, steps: &[AgentStep], inputs: &Values) -> Result<AgentDecision, AgentError> {
        let mut values = inputs.clone();
        values.insert("agent_scratchpad".into(), scratchpad(steps));
        let prompt = self.prompt.format(&values)?;

        let output = self.llm.complete(&prompt, &self.stop).await?;
        debug!(chars = output.len(), steps = steps.len(), "ReactAgent completion received");

        parse_output(&output, self.style.finish_marker(), &self.output_key)
    }

    fn input_keys(&self) -> Vec<String> {
        self.style.input_keys()
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }
}

fn bind_tools(prompt: PromptTemplate, tools: &[Arc<dyn Tool>]) -> PromptTemplate {
    let descriptions = tools
        .iter()
        .map(|t| format!("{}: {}", t.name(), t.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let names = tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
    prompt
        .partial("tool_descriptions", descriptions)
        .partial("tool_names", names)
}

/// Replay of all steps so far, ready to be appended after `Thought:`.
pub fn scratchpad(steps: &[AgentStep]) -> String {
    steps
        .iter()
        .map(|step| format!("{}\nObservation: {}\nThought:", step.action.log, step.observation))
        .collect()
}

/// Turn a model continuation into a decision.
pub fn parse_output(
    output: &str,
    finish_marker: &str,
    output_key: &str,
) -> Result<AgentDecision, AgentError> {
    if let Some(pos) = output.find(finish_marker) {
        let answer = output[pos + finish_marker.len()..].trim();
        return Ok(AgentDecision::Finish(
            AgentFinish::single(output_key, answer).with_log(output),
        ));
    }

    let captures = ACTION_RE
        .as_ref()
        .and_then(|re| re.captures(output))
        .ok_or_else(|| AgentError::parse(output))?;
    let tool = captures.get(1).map_or("", |m| m.as_str()).trim();
    let tool_input = captures
        .get(2)
        .map_or("", |m| m.as_str())
        .trim()
        .trim_matches('"');

    if tool.is_empty() {
        return Err(AgentError::parse(output));
    }

    Ok(AgentDecision::action(
        AgentAction::new(tool, tool_input).with_log(output),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockLlm, values};
    use stepwise_tools::{CalculatorTool, WebSearchTool};

    fn tools() -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(CalculatorTool), Arc::new(WebSearchTool::serpapi(None).unwrap())]
    }

    #[test]
    fn action_pattern_compiles() {
        assert!(ACTION_RE.is_some());
    }

    #[test]
    fn parses_action() {
        let out = " I should multiply.\nAction: calculator\nAction Input: 1987*34";
        let decision = parse_output(out, "Final Answer:", "output").unwrap();
        match decision {
            AgentDecision::Actions(actions) => {
                assert_eq!(actions.len(), 1);
                assert_eq!(actions[0].tool, "calculator");
                assert_eq!(actions[0].tool_input, "1987*34");
                assert_eq!(actions[0].log, out);
            }
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn parses_quoted_multiline_input() {
        let out = "Action: web_search\nAction Input: \"rust\nlang\"\n";
        let AgentDecision::Actions(actions) = parse_output(out, "Final Answer:", "output").unwrap()
        else {
            panic!("expected action");
        };
        assert_eq!(actions[0].tool_input, "rust\nlang");
    }

    #[test]
    fn parses_final_answer() {
        let out = " I now know the final answer\nFinal Answer: 67558";
        let decision = parse_output(out, "Final Answer:", "output").unwrap();
        assert_eq!(
            decision,
            AgentDecision::Finish(AgentFinish::single("output", "67558").with_log(out))
        );
    }

    #[test]
    fn finish_marker_wins_over_action() {
        let out = "Action: calculator\nAction Input: 1+1\nFinal Answer: 2";
        assert!(parse_output(out, "Final Answer:", "output").unwrap().is_finish());
    }

    #[test]
    fn conversational_marker() {
        let out = " Do I need to use a tool? No\nAI: Your name is Bob.";
        let AgentDecision::Finish(finish) = parse_output(out, "AI:", "output").unwrap() else {
            panic!("expected finish");
        };
        assert_eq!(finish.return_values["output"], "Your name is Bob.");
    }

    #[test]
    fn free_text_is_parse_error() {
        let err = parse_output("I am not sure what to do.", "Final Answer:", "output").unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("I am not sure what to do."));
    }

    #[test]
    fn scratchpad_replays_steps() {
        let steps = vec![
            AgentStep::new(
                AgentAction::new("calculator", "2+2").with_log(" add\nAction: calculator\nAction Input: 2+2"),
                "4",
            ),
            AgentStep::synthetic("unable to parse agent output: hmm"),
        ];
        assert_eq!(
            scratchpad(&steps),
            " add\nAction: calculator\nAction Input: 2+2\nObservation: 4\nThought:\
             \nObservation: unable to parse agent output: hmm\nThought:"
        );
        assert_eq!(scratchpad(&[]), "");
    }

    #[tokio::test]
    async fn prompt_lists_tools_and_scratchpad() {
        let llm = Arc::new(SequentialMockLlm::new(&["Final Answer: 4"]));
        let agent = ReactAgent::zero_shot(llm.clone(), &tools());

        let decision = agent
            .plan(&[], &values(&[("input", "What is 2+2?")]))
            .await
            .unwrap();
        assert!(decision.is_finish());

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("calculator: Useful for getting the result of a math expression"));
        assert!(prompt.contains("should be one of [calculator, web_search]"));
        assert!(prompt.ends_with("Question: What is 2+2?\nThought:"));
    }

    #[tokio::test]
    async fn chat_backends_get_chat_prompt() {
        let llm = Arc::new(SequentialMockLlm::new(&[]).chat());
        let agent = ReactAgent::zero_shot(llm, &tools());
        assert!(agent.prompt().template().contains("Never write an Observation"));

        let llm = Arc::new(SequentialMockLlm::new(&[]));
        let agent = ReactAgent::zero_shot(llm, &tools());
        assert!(!agent.prompt().template().contains("Never write an Observation"));
    }

    #[test]
    fn conversational_needs_history() {
        let llm = Arc::new(SequentialMockLlm::new(&[]));
        let agent = ReactAgent::conversational(llm, &tools());
        assert_eq!(agent.input_keys(), vec!["input", "history"]);
        assert_eq!(agent.output_keys(), vec!["output"]);
    }

    #[tokio::test]
    async fn missing_input_is_prompt_error() {
        let llm = Arc::new(SequentialMockLlm::new(&[]));
        let agent = ReactAgent::zero_shot(llm.clone(), &tools());
        let err = agent.plan(&[], &Values::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::Prompt(_)));
        assert_eq!(llm.call_count(), 0);
    }
}
